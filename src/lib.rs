//! # Intcode
//!
//! This crate implements a small integer virtual machine, and a network
//! of those machines passing packets to one another.
//!
//! ## What is the machine?
//!
//! A program is a list of signed 64 bit integers, and it is also the
//! machine's memory: instructions and data live in the same cells, and a
//! program is free to rewrite itself. Memory grows on demand, so reading
//! or writing past the end of the image just works. Every instruction is
//! an opcode word followed by its arguments, and the opcode word also
//! says how each argument is addressed: as a memory position, as an
//! immediate value, or relative to a movable base register.
//!
//! All worldly input is done through a single instruction, and all
//! worldly output is done through a single instruction. Where those
//! values come from is up to the [`vm::Device`] the machine is wired to:
//! a fixed list, a queue shared with another thread, a closure, or the
//! terminal.
//!
//! ## Index
//!
//! 1. [The Virtual Machine](./vm/index.html)
//! 2. [Input and Output](./side_effects/index.html)
//! 3. [Machine Networks](./network/index.html)
//! 4. [Parsing Program Images](./parse/index.html)
//!
//! ## Example
//!
//! ```rust
//! use intcode::vm::{execute, Program};
//!
//! // Read a value, and print it back out.
//! let program: Program = "3,0,4,0,99".parse().unwrap();
//! let (output, memory) = execute(&program, [42]).unwrap();
//! assert_eq!(output, vec![42]);
//! assert_eq!(memory[0], 42);
//! ```

pub mod network;
pub mod parse;
pub mod side_effects;
pub mod vm;
