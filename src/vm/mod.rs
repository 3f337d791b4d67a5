//! # Virtual Machine Module
//!
//! This module contains all things related to the virtual machine.
//!
//! ### What is this machine?
//!
//! The machine is a stored-program computer: the program and its data
//! share one [`Memory`], and programs are free to rewrite their own
//! instructions. There are two registers: the instruction pointer, and
//! a relative base used by the relative addressing mode.
//!
//! ### What data can it use?
//!
//! Every cell of memory is a signed 64 bit integer. An instruction word
//! encodes its operation in its two lowest decimal digits, and the
//! addressing mode of each argument in the digits above them (see
//! [`Instruction::decode`]).
//!
//! ### How does it talk to the world?
//!
//! Through a [`Device`]. The `in` instruction asks the device for a
//! value, and the `out` instruction hands it one. Devices are built out
//! of the input and output channels in [`crate::side_effects`].
use ::std::fmt;

mod core;
pub use self::core::*;

mod memory;
pub use self::memory::*;

mod interpreter;
pub use self::interpreter::*;

pub mod batch;

/// Run a program to completion on a finite input, and return everything
/// it printed together with its final memory.
pub fn execute(
    program: &Program,
    input: impl IntoIterator<Item = i64>,
) -> Result<(Vec<i64>, Vec<i64>), Error> {
    let mut machine = Interpreter::new(program, TestingDevice::new_raw(input.into_iter().collect()));
    machine.run()?;
    let memory = machine.memory().as_slice().to_vec();
    Ok((machine.into_device().output_vals(), memory))
}

/// An error raised by the machine, or by the device it is wired to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The low digits of the instruction word name no operation.
    UnknownOpcode { ip: usize, word: i64 },
    /// A mode digit of the instruction word is not 0, 1 or 2.
    UnknownMode { ip: usize, word: i64, digit: i64 },
    /// An instruction (or one of its arguments) lies past the end of memory.
    OutOfProgram { ip: usize, addr: usize, len: usize },
    /// An argument resolved to an address below zero.
    NegativeAddress { ip: usize, opcode: Opcode, address: i64 },
    /// An instruction tried to write through an immediate argument.
    ImmediateWrite { ip: usize, opcode: Opcode },
    /// A finite input was read after its last value.
    InputExhausted,
    /// The other end of a blocking channel went away.
    Disconnected,
    /// The network asked the machine to stop.
    Shutdown,
    /// Any other failure reported by a device.
    Device(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnknownOpcode { ip, word } => {
                write!(f, "unknown opcode in word {word} at ip {ip}")
            }
            Self::UnknownMode { ip, word, digit } => {
                write!(f, "unknown addressing mode {digit} in word {word} at ip {ip}")
            }
            Self::OutOfProgram { ip, addr, len } => write!(
                f,
                "instruction at ip {ip} reads address {addr} past the end of the program (length {len})"
            ),
            Self::NegativeAddress { ip, opcode, address } => {
                write!(f, "{opcode} at ip {ip} addressed negative cell {address}")
            }
            Self::ImmediateWrite { ip, opcode } => {
                write!(f, "{opcode} at ip {ip} writes through an immediate argument")
            }
            Self::InputExhausted => write!(f, "no more input"),
            Self::Disconnected => write!(f, "channel disconnected"),
            Self::Shutdown => write!(f, "shutdown requested"),
            Self::Device(msg) => write!(f, "device error: {msg}"),
        }
    }
}

impl ::std::error::Error for Error {}
