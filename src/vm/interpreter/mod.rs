//! # The Interpreter Module
//!
//! This module implements the interpreter for the virtual machine. The
//! interpreter is supplied with a `Device` object, which acts as a generic
//! frontend of the machine to interact with the world. The `Device` object
//! is responsible for supplying the input and handling the output of the
//! program. For testing the machine we use a `TestingDevice` object to
//! supply sample input and capture the output to test against the
//! predicted output.
use super::Error;
use crate::side_effects::{Input, Output};

mod core;
pub use self::core::*;

use ::std::{
    collections::VecDeque,
    io::{stdin, stdout, BufRead, Write},
};

/// Create an input / output device for the virtual machine interpreter
/// to operate on. The method `get` retrieves the device's input, and the
/// function `put` writes to the devices output.
pub trait Device {
    /// Get the next input value.
    fn get(&mut self) -> Result<i64, Error>;
    /// Put the given value to the output.
    fn put(&mut self, val: i64) -> Result<(), Error>;
}

/// A device made of any input paired with any output.
#[derive(Debug, Default)]
pub struct Channels<I, O> {
    pub input: I,
    pub output: O,
}

impl<I: Input, O: Output> Channels<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}

impl<I: Input, O: Output> Device for Channels<I, O> {
    fn get(&mut self) -> Result<i64, Error> {
        self.input.get()
    }

    fn put(&mut self, val: i64) -> Result<(), Error> {
        self.output.put(val)
    }
}

/// A device used for testing. This simply keeps a buffer of sample input
/// to supply to the virtual machine, and keeps an output buffer to keep
/// track of the output of the virtual machine.
#[derive(Debug, Default)]
pub struct TestingDevice {
    pub input: VecDeque<i64>,
    pub output: Vec<i64>,
}

impl TestingDevice {
    /// Create a new testing device with some given sample text, fed to
    /// the machine one character code at a time.
    pub fn new(sample_input: impl ToString) -> Self {
        Self {
            input: sample_input
                .to_string()
                .chars()
                .map(|ch| ch as i64)
                .collect(),
            output: vec![],
        }
    }

    pub fn new_raw(input: Vec<i64>) -> Self {
        Self {
            input: input.into(),
            output: vec![],
        }
    }

    /// Get the output of the testing device as a string (ascii).
    pub fn output_str(&self) -> String {
        self.output
            .iter()
            .map(|&val| u8::try_from(val).map(char::from).unwrap_or('?'))
            .collect()
    }

    pub fn output_vals(&self) -> Vec<i64> {
        self.output.clone()
    }
}

/// Make the testing device work with the interpreter.
impl Device for TestingDevice {
    fn get(&mut self) -> Result<i64, Error> {
        Input::get(&mut self.input)
    }

    fn put(&mut self, val: i64) -> Result<(), Error> {
        self.output.put(val)
    }
}

/// A device used for standard input and output.
///
/// In numeric mode every input is an integer read from standard-in
/// (several may share a line, separated by commas or whitespace), and
/// every output is printed on its own line. In ASCII mode input lines
/// are fed character by character with a trailing newline, and outputs
/// are printed as characters, except values outside the ASCII range,
/// which are printed as numbers.
#[derive(Debug, Default)]
pub struct StandardDevice {
    ascii: bool,
    pending: VecDeque<i64>,
}

impl StandardDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascii() -> Self {
        Self {
            ascii: true,
            pending: VecDeque::new(),
        }
    }

    fn read_line(&mut self) -> Result<String, Error> {
        if !self.ascii {
            print!("? ");
        }
        stdout()
            .flush()
            .map_err(|e| Error::Device(format!("could not flush output: {e}")))?;

        let mut line = String::new();
        let n = stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| Error::Device(format!("could not get user input: {e}")))?;
        if n == 0 {
            return Err(Error::InputExhausted);
        }
        Ok(line)
    }

    fn refill(&mut self) -> Result<(), Error> {
        while self.pending.is_empty() {
            let line = self.read_line()?;
            if self.ascii {
                self.pending
                    .extend(line.trim_end_matches(['\r', '\n']).chars().map(|ch| ch as i64));
                self.pending.push_back('\n' as i64);
            } else {
                for token in line.split(|ch: char| ch == ',' || ch.is_whitespace()) {
                    if token.is_empty() {
                        continue;
                    }
                    let val = token
                        .parse::<i64>()
                        .map_err(|_| Error::Device(format!("{token:?} is not an integer")))?;
                    self.pending.push_back(val);
                }
            }
        }
        Ok(())
    }
}

impl Device for StandardDevice {
    fn get(&mut self) -> Result<i64, Error> {
        self.refill()?;
        Input::get(&mut self.pending)
    }

    fn put(&mut self, val: i64) -> Result<(), Error> {
        match u8::try_from(val) {
            Ok(ch) if self.ascii && ch.is_ascii() => print!("{}", ch as char),
            _ => println!("{val}"),
        }
        stdout()
            .flush()
            .map_err(|e| Error::Device(format!("could not flush output: {e}")))
    }
}
