//! # Side Effects Module
//!
//! This module implements the channels a machine's `in` and `out`
//! instructions are wired to. The interpreter never cares where its
//! values come from: it only ever talks to a [`crate::vm::Device`],
//! and devices are assembled from the inputs and outputs defined here.

pub mod io;

pub use io::*;
