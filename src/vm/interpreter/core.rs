//! # Core Interpreter Module
//!
//! This module implements the execution core: one machine, its memory,
//! its registers, and the device it is wired to.
use crate::vm::{Arg, Device, Error, Instruction, Memory, Mode, Opcode, Program};

use log::{debug, error, trace};

/// The lifecycle of a machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// The machine can execute its next instruction.
    Running,
    /// The machine executed `halt`.
    Halted,
    /// The machine hit an error. It will report the same error forever.
    Faulted(Error),
}

/// The interpreter which runs a program.
pub struct Interpreter<T>
where
    T: Device,
{
    /// The interpreter's I/O device.
    device: T,
    /// The machine's memory, initialized with a copy of the program.
    memory: Memory,
    /// The instruction pointer.
    ip: usize,
    /// The relative base register.
    base: i64,
    /// Is the interpreter finished interpreting?
    state: State,
    /// The last value emitted by `out`, until someone takes it.
    emitted: Option<i64>,
}

impl<T> Interpreter<T>
where
    T: Device,
{
    pub fn new(program: &Program, device: T) -> Self {
        Self {
            device,
            memory: Memory::new(program.words()),
            ip: 0,
            base: 0,
            state: State::Running,
            emitted: None,
        }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn base(&self) -> i64 {
        self.base
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable access to memory, for patching cells before (or between) runs.
    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut T {
        &mut self.device
    }

    pub fn into_device(self) -> T {
        self.device
    }

    /// Run the program to completion.
    pub fn run(&mut self) -> Result<(), Error> {
        while self.step()? {}
        Ok(())
    }

    /// Run the program to completion, and give back the device.
    pub fn finish(mut self) -> Result<T, Error> {
        self.run()?;
        Ok(self.device)
    }

    /// Run until the program outputs a value, and return it. The value is
    /// still passed on to the device. Returns `None` if the program halts
    /// before printing anything.
    pub fn run_until_output(&mut self) -> Result<Option<i64>, Error> {
        self.emitted = None;
        while self.step()? {
            if let Some(val) = self.emitted.take() {
                return Ok(Some(val));
            }
        }
        Ok(None)
    }

    /// Run a single instruction. Returns `false` once the machine has halted.
    pub fn step(&mut self) -> Result<bool, Error> {
        match &self.state {
            State::Halted => return Ok(false),
            State::Faulted(e) => return Err(e.clone()),
            State::Running => {}
        }

        match self.execute() {
            Ok(true) => Ok(true),
            Ok(false) => {
                debug!("halted at ip {}", self.ip);
                self.state = State::Halted;
                Ok(false)
            }
            Err(e) => {
                match &e {
                    Error::Shutdown | Error::Disconnected => debug!("stopped at ip {}: {e}", self.ip),
                    _ => error!("fault at ip {}: {e}", self.ip),
                }
                self.state = State::Faulted(e.clone());
                Err(e)
            }
        }
    }

    /// Decode and execute the instruction under the instruction pointer.
    fn execute(&mut self) -> Result<bool, Error> {
        let instruction = Instruction::decode(&self.memory, self.ip)?;
        trace!("{instruction}");

        let opcode = instruction.opcode;
        let args = instruction.args();
        match opcode {
            Opcode::Add => {
                let val = self.read(opcode, args[0])?.wrapping_add(self.read(opcode, args[1])?);
                self.write(opcode, args[2], val)?
            }
            Opcode::Mul => {
                let val = self.read(opcode, args[0])?.wrapping_mul(self.read(opcode, args[1])?);
                self.write(opcode, args[2], val)?
            }
            Opcode::In => {
                // Refuse before consuming any input.
                if args[0].mode == Mode::Immediate {
                    return Err(Error::ImmediateWrite { ip: self.ip, opcode });
                }
                let val = self.device.get()?;
                self.write(opcode, args[0], val)?
            }
            Opcode::Out => {
                let val = self.read(opcode, args[0])?;
                self.device.put(val)?;
                self.emitted = Some(val);
            }
            Opcode::JumpNonZero | Opcode::JumpZero => {
                let cond = self.read(opcode, args[0])?;
                if (cond != 0) == (opcode == Opcode::JumpNonZero) {
                    let target = self.read(opcode, args[1])?;
                    self.ip = usize::try_from(target).map_err(|_| Error::NegativeAddress {
                        ip: self.ip,
                        opcode,
                        address: target,
                    })?;
                } else {
                    self.ip = instruction.next();
                }
                return Ok(true);
            }
            Opcode::SetLessThan => {
                let val = self.read(opcode, args[0])? < self.read(opcode, args[1])?;
                self.write(opcode, args[2], i64::from(val))?
            }
            Opcode::SetEqual => {
                let val = self.read(opcode, args[0])? == self.read(opcode, args[1])?;
                self.write(opcode, args[2], i64::from(val))?
            }
            Opcode::SetBase => {
                self.base = self.base.wrapping_add(self.read(opcode, args[0])?);
            }
            Opcode::Halt => return Ok(false),
        }

        self.ip = instruction.next();
        Ok(true)
    }

    /// The address an argument refers to. Immediate arguments have none.
    fn address(&self, arg: Arg) -> Option<i64> {
        match arg.mode {
            Mode::Positional => Some(arg.value),
            Mode::Relative => Some(self.base.wrapping_add(arg.value)),
            Mode::Immediate => None,
        }
    }

    /// Get the value of an argument.
    fn read(&mut self, opcode: Opcode, arg: Arg) -> Result<i64, Error> {
        match self.address(arg) {
            Some(address) => self.memory.read(address).map_err(|_| Error::NegativeAddress {
                ip: self.ip,
                opcode,
                address,
            }),
            None => Ok(arg.value),
        }
    }

    /// Store a value through a write-target argument.
    fn write(&mut self, opcode: Opcode, arg: Arg, val: i64) -> Result<(), Error> {
        let ip = self.ip;
        let address = self
            .address(arg)
            .ok_or(Error::ImmediateWrite { ip, opcode })?;
        self.memory
            .write(address, val)
            .map_err(|_| Error::NegativeAddress { ip, opcode, address })
    }
}
