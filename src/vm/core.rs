//! The instruction set of the virtual machine is defined here.
//!
//! Instructions are never stored in decoded form: the interpreter
//! decodes the word under the instruction pointer on every step, because
//! programs are allowed to overwrite their own code.
use super::{Error, Memory};
use core::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

/// The most arguments any instruction takes.
pub const MAX_ARGS: usize = 3;

/// An operation of the machine.
///
/// The set of operations is closed: decoding a word whose low digits
/// name none of these is an error, and the interpreter matches on this
/// enum exhaustively.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// `mem[a3] = a1 + a2`
    Add,
    /// `mem[a3] = a1 * a2`
    Mul,
    /// `mem[a1] = input`
    In,
    /// `output a1`
    Out,
    /// Jump to `a2` if `a1` is not zero.
    JumpNonZero,
    /// Jump to `a2` if `a1` is zero.
    JumpZero,
    /// `mem[a3] = a1 < a2`
    SetLessThan,
    /// `mem[a3] = a1 == a2`
    SetEqual,
    /// `base += a1`
    SetBase,
    /// Stop the machine.
    Halt,
}

impl Opcode {
    /// Every operation, in the order of their codes.
    pub const ALL: [Opcode; 10] = [
        Opcode::Add,
        Opcode::Mul,
        Opcode::In,
        Opcode::Out,
        Opcode::JumpNonZero,
        Opcode::JumpZero,
        Opcode::SetLessThan,
        Opcode::SetEqual,
        Opcode::SetBase,
        Opcode::Halt,
    ];

    /// Look up the operation selected by the two low digits of a word.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            1 => Self::Add,
            2 => Self::Mul,
            3 => Self::In,
            4 => Self::Out,
            5 => Self::JumpNonZero,
            6 => Self::JumpZero,
            7 => Self::SetLessThan,
            8 => Self::SetEqual,
            9 => Self::SetBase,
            99 => Self::Halt,
            _ => return None,
        })
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::Add => 1,
            Self::Mul => 2,
            Self::In => 3,
            Self::Out => 4,
            Self::JumpNonZero => 5,
            Self::JumpZero => 6,
            Self::SetLessThan => 7,
            Self::SetEqual => 8,
            Self::SetBase => 9,
            Self::Halt => 99,
        }
    }

    /// The number of arguments following the instruction word.
    pub fn arity(&self) -> usize {
        match self {
            Self::Add | Self::Mul | Self::SetLessThan | Self::SetEqual => 3,
            Self::JumpNonZero | Self::JumpZero => 2,
            Self::In | Self::Out | Self::SetBase => 1,
            Self::Halt => 0,
        }
    }

    /// The mnemonic used in traces and listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Mul => "mul",
            Self::In => "in",
            Self::Out => "out",
            Self::JumpNonZero => "jnz",
            Self::JumpZero => "jz",
            Self::SetLessThan => "setlt",
            Self::SetEqual => "seteq",
            Self::SetBase => "setbase",
            Self::Halt => "halt",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How an argument's stored value is interpreted.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// The value is the address of the operand.
    #[default]
    Positional,
    /// The value is the operand.
    Immediate,
    /// The value is an offset from the relative base.
    Relative,
}

impl Mode {
    pub fn from_digit(digit: i64) -> Option<Self> {
        match digit {
            0 => Some(Self::Positional),
            1 => Some(Self::Immediate),
            2 => Some(Self::Relative),
            _ => None,
        }
    }

    pub fn digit(&self) -> i64 {
        match self {
            Self::Positional => 0,
            Self::Immediate => 1,
            Self::Relative => 2,
        }
    }
}

/// A decoded argument: an addressing mode and the raw operand word.
#[derive(Default, Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Arg {
    pub mode: Mode,
    pub value: i64,
}

impl Arg {
    pub fn positional(value: i64) -> Self {
        Self {
            mode: Mode::Positional,
            value,
        }
    }

    pub fn immediate(value: i64) -> Self {
        Self {
            mode: Mode::Immediate,
            value,
        }
    }

    pub fn relative(value: i64) -> Self {
        Self {
            mode: Mode::Relative,
            value,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mode {
            Mode::Positional => write!(f, "{}", self.value),
            Mode::Immediate => write!(f, "#{}", self.value),
            Mode::Relative => write!(f, "B{:+}", self.value),
        }
    }
}

/// An instruction decoded from memory, along with where it was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
    pub ip: usize,
    pub opcode: Opcode,
    args: [Arg; MAX_ARGS],
}

impl Instruction {
    /// Build an instruction from its parts. Extra arguments beyond the
    /// opcode's arity are ignored, and missing ones are positional zeroes.
    pub fn new(ip: usize, opcode: Opcode, args: &[Arg]) -> Self {
        let mut slots = [Arg::default(); MAX_ARGS];
        for (slot, arg) in slots.iter_mut().zip(args).take(opcode.arity()) {
            *slot = *arg;
        }
        Self {
            ip,
            opcode,
            args: slots,
        }
    }

    /// Decode the instruction at `ip`.
    ///
    /// The two low decimal digits of the word select the operation. The
    /// hundreds digit is the mode of the first argument, the thousands
    /// digit the mode of the second, and the ten-thousands digit the mode
    /// of the third. Missing digits mean positional mode.
    pub fn decode(memory: &Memory, ip: usize) -> Result<Self, Error> {
        let fetch = |addr: usize| {
            memory.fetch(addr).ok_or(Error::OutOfProgram {
                ip,
                addr,
                len: memory.len(),
            })
        };

        let word = fetch(ip)?;
        if word < 0 {
            return Err(Error::UnknownOpcode { ip, word });
        }
        let opcode = Opcode::from_code(word % 100).ok_or(Error::UnknownOpcode { ip, word })?;

        let mut args = [Arg::default(); MAX_ARGS];
        let mut modes = word / 100;
        for (i, arg) in args.iter_mut().enumerate().take(opcode.arity()) {
            let digit = modes % 10;
            arg.mode = Mode::from_digit(digit).ok_or(Error::UnknownMode { ip, word, digit })?;
            arg.value = fetch(ip + 1 + i)?;
            modes /= 10;
        }

        Ok(Self { ip, opcode, args })
    }

    /// The words this instruction occupies in memory.
    pub fn encode(&self) -> Vec<i64> {
        let mut word = self.opcode.code();
        let mut place = 100;
        for arg in self.args() {
            word += arg.mode.digit() * place;
            place *= 10;
        }

        let mut words = vec![word];
        words.extend(self.args().iter().map(|arg| arg.value));
        words
    }

    /// The arguments of the instruction (as many as the opcode takes).
    pub fn args(&self) -> &[Arg] {
        &self.args[..self.opcode.arity()]
    }

    /// The number of words this instruction occupies.
    pub fn len(&self) -> usize {
        1 + self.opcode.arity()
    }

    /// The address of the instruction that follows this one in memory.
    pub fn next(&self) -> usize {
        self.ip + self.len()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.ip, self.opcode)?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// A program image: the initial contents of a machine's memory.
///
/// Every machine started from a program gets its own copy, so one image
/// can be run any number of times.
#[derive(Default, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Program(pub Vec<i64>);

impl Program {
    pub fn new(words: impl Into<Vec<i64>>) -> Self {
        Self(words.into())
    }

    pub fn words(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this program with some cells replaced, such as the
    /// operand slots a puzzle asks to patch before running.
    pub fn with_overrides(&self, overrides: &[(usize, i64)]) -> Self {
        let mut words = self.0.clone();
        for &(addr, value) in overrides {
            if addr >= words.len() {
                words.resize(addr + 1, 0);
            }
            words[addr] = value;
        }
        Self(words)
    }

    /// Decode the program from the start, one instruction after another.
    ///
    /// Words that do not decode are yielded as errors, and the walk
    /// resumes at the next word.
    pub fn disassemble(&self) -> Vec<Result<Instruction, (usize, i64)>> {
        let memory = Memory::new(&self.0);
        let mut listing = vec![];
        let mut ip = 0;
        while ip < self.0.len() {
            match Instruction::decode(&memory, ip) {
                Ok(instruction) => {
                    ip = instruction.next();
                    listing.push(Ok(instruction));
                }
                Err(_) => {
                    listing.push(Err((ip, self.0[ip])));
                    ip += 1;
                }
            }
        }
        listing
    }
}

impl From<Vec<i64>> for Program {
    fn from(words: Vec<i64>) -> Self {
        Self(words)
    }
}

impl FromStr for Program {
    type Err = crate::parse::SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse::parse_program(s)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if f.alternate() {
            for line in self.disassemble() {
                match line {
                    Ok(instruction) => writeln!(f, "{instruction}")?,
                    Err((ip, word)) => writeln!(f, "{ip}: data {word}")?,
                }
            }
            return Ok(());
        }

        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{word}")?;
        }
        Ok(())
    }
}
