//! # Memory Module
//!
//! The address space of a single machine. Memory is a flat array of
//! integer cells, indexed from zero, which grows on demand: reading or
//! writing any non-negative address always succeeds, and cells that
//! were never written read as zero. Memory never shrinks.
//!
//! Cells are kept in a contiguous vector up to [`DENSE_LIMIT`]. Cells
//! written beyond that (and beyond the loaded image) live in a sparse
//! map, so a program touching address `i64::MAX` costs one entry.
//!
//! Instruction fetches are the one exception to auto-growth. The
//! interpreter fetches opcodes and operands with [`Memory::fetch`],
//! which refuses to read cells that were never stored, so a runaway
//! instruction pointer is reported instead of executing zeroes forever.
use core::fmt;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How far the contiguous part of memory may grow on demand.
pub const DENSE_LIMIT: usize = 1 << 20;

/// An attempt to address a cell below zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NegativeAddress(pub i64);

impl fmt::Display for NegativeAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "negative address {}", self.0)
    }
}

/// The growable, zero-filled memory of a machine.
#[derive(Default, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<i64>,
    /// Cells past the contiguous part, by address.
    sparse: BTreeMap<u64, i64>,
}

impl Memory {
    /// Create a memory holding a copy of the given image.
    pub fn new(image: &[i64]) -> Self {
        Self {
            cells: image.to_vec(),
            sparse: BTreeMap::new(),
        }
    }

    /// The number of contiguous cells currently backed by storage.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.sparse.is_empty()
    }

    /// Read the cell at `addr`, growing the memory if it lies past the end.
    pub fn read(&mut self, addr: i64) -> Result<i64, NegativeAddress> {
        Ok(match self.locate(addr)? {
            Cell::Dense(i) => self.cells[i],
            Cell::Sparse(key) => self.sparse.get(&key).copied().unwrap_or(0),
        })
    }

    /// Write `value` to the cell at `addr`, growing the memory if needed.
    pub fn write(&mut self, addr: i64, value: i64) -> Result<(), NegativeAddress> {
        match self.locate(addr)? {
            Cell::Dense(i) => self.cells[i] = value,
            Cell::Sparse(key) => {
                self.sparse.insert(key, value);
            }
        }
        Ok(())
    }

    /// Read a word of the instruction stream. This never grows the memory.
    pub fn fetch(&self, addr: usize) -> Option<i64> {
        self.cells
            .get(addr)
            .or_else(|| self.sparse.get(&(addr as u64)))
            .copied()
    }

    /// The contiguous cells. Sparse cells far past the end are not included.
    pub fn as_slice(&self) -> &[i64] {
        &self.cells
    }

    pub fn into_vec(self) -> Vec<i64> {
        self.cells
    }

    /// Find where `addr` is stored, growing the contiguous part if it is
    /// within reach.
    fn locate(&mut self, addr: i64) -> Result<Cell, NegativeAddress> {
        let key = u64::try_from(addr).map_err(|_| NegativeAddress(addr))?;
        match usize::try_from(key) {
            Ok(i) if i < self.cells.len() => Ok(Cell::Dense(i)),
            Ok(i) if i < DENSE_LIMIT => {
                self.cells.resize(i + 1, 0);
                Ok(Cell::Dense(i))
            }
            _ => Ok(Cell::Sparse(key)),
        }
    }
}

enum Cell {
    Dense(usize),
    Sparse(u64),
}

impl From<Vec<i64>> for Memory {
    fn from(cells: Vec<i64>) -> Self {
        Self {
            cells,
            sparse: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_past_end_zero_fills() {
        let mut memory = Memory::new(&[1, 2, 3]);
        let k = 37;
        memory.write(k, 99).unwrap();
        assert_eq!(memory.len(), k as usize + 1);

        for addr in 0..=k {
            let expected = match addr {
                0 => 1,
                1 => 2,
                2 => 3,
                a if a == k => 99,
                _ => 0,
            };
            assert_eq!(memory.read(addr).unwrap(), expected, "address {addr}");
        }
    }

    #[test]
    fn test_empty_memory_grows_from_zero() {
        let mut memory = Memory::default();
        assert!(memory.is_empty());
        memory.write(5, -4).unwrap();
        assert_eq!(memory.as_slice(), &[0, 0, 0, 0, 0, -4]);
    }

    #[test]
    fn test_read_past_end() {
        let mut memory = Memory::new(&[7]);
        assert_eq!(memory.read(1000).unwrap(), 0);
        assert_eq!(memory.len(), 1001);
        assert_eq!(memory.read(0).unwrap(), 7);
    }

    #[test]
    fn test_negative_address() {
        let mut memory = Memory::new(&[7, 8]);
        assert_eq!(memory.read(-1), Err(NegativeAddress(-1)));
        assert_eq!(memory.write(-20, 1), Err(NegativeAddress(-20)));
        // A failed write must leave the memory alone.
        assert_eq!(memory.as_slice(), &[7, 8]);
    }

    #[test]
    fn test_fetch_does_not_grow() {
        let memory = Memory::new(&[1, 2]);
        assert_eq!(memory.fetch(1), Some(2));
        assert_eq!(memory.fetch(2), None);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_far_addresses() {
        let mut memory = Memory::new(&[1, 2]);
        assert_eq!(memory.read(i64::MAX), Ok(0));
        memory.write(i64::MAX, 5).unwrap();
        memory.write(1_000_000_000_000_000, -6).unwrap();
        assert_eq!(memory.read(i64::MAX), Ok(5));
        assert_eq!(memory.read(1_000_000_000_000_000), Ok(-6));
        assert_eq!(memory.read(1_000_000_000_000_001), Ok(0));
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.fetch(1_000_000_000_000_000), Some(-6));
        assert_eq!(memory.fetch(1_000_000_000_000_001), None);
    }

    #[test]
    fn test_dense_growth_stops_at_limit() {
        let mut memory = Memory::default();
        memory.write(DENSE_LIMIT as i64 - 1, 3).unwrap();
        assert_eq!(memory.len(), DENSE_LIMIT);
        memory.write(DENSE_LIMIT as i64, 4).unwrap();
        assert_eq!(memory.len(), DENSE_LIMIT);
        assert_eq!(memory.read(DENSE_LIMIT as i64 - 1), Ok(3));
        assert_eq!(memory.read(DENSE_LIMIT as i64), Ok(4));
    }

    #[test]
    fn test_copy_is_independent() {
        let image = vec![1, 2, 3];
        let mut memory = Memory::new(&image);
        memory.write(0, 100).unwrap();
        assert_eq!(image, vec![1, 2, 3]);
        assert_eq!(memory.into_vec(), vec![100, 2, 3]);
    }
}
