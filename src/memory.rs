//! The flat byte-addressable memory of the machine.

use std::fmt;

/// Error type for invalid memory accesses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryError {
    /// The address of the offending access.
    pub address: usize,

    /// The capacity of the memory.
    pub size: usize,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "address {} out of range for a memory of {} bytes", self.address, self.size)
    }
}

impl std::error::Error for MemoryError {}

/// A flat buffer of unsigned 8-bit cells with bounds-checked access.
///
/// The program counter is 16-bit, so the memory can be larger than the
/// 256 bytes reachable by an 8-bit operand.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<u8>,
}

/// The default capacity, the full 8-bit operand address space.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

impl Default for Memory {
    fn default() -> Memory {
        Memory::new(DEFAULT_MEMORY_SIZE)
    }
}

impl Memory {
    /// Creates a zeroed memory of `size` bytes. Sizes below 256 are rounded up
    /// so that every operand-addressable cell exists.
    pub fn new(size: usize) -> Memory {
        Memory {
            cells: vec![0; std::cmp::max(size, DEFAULT_MEMORY_SIZE)],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, address: usize) -> Result<u8, MemoryError> {
        self.cells
            .get(address)
            .copied()
            .ok_or(MemoryError { address, size: self.cells.len() })
    }

    pub fn set(&mut self, address: usize, value: u8) -> Result<(), MemoryError> {
        match self.cells.get_mut(address) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(MemoryError { address, size: self.cells.len() }),
        }
    }

    /// Copies a program image into memory starting at address 0.
    pub fn load(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > self.cells.len() {
            return Err(MemoryError {
                address: image.len() - 1,
                size: self.cells.len(),
            });
        }

        self.cells[..image.len()].copy_from_slice(image);

        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_checked() {
        let mut memory = Memory::new(256);

        assert_eq!(memory.get(255), Ok(0));
        assert_eq!(memory.get(256), Err(MemoryError { address: 256, size: 256 }));
        assert_eq!(memory.set(256, 1), Err(MemoryError { address: 256, size: 256 }));

        memory.set(7, 42).unwrap();
        assert_eq!(memory.get(7), Ok(42));
    }

    #[test]
    fn size_is_rounded_up_to_operand_space() {
        assert_eq!(Memory::new(16).size(), 256);
        assert_eq!(Memory::new(1024).size(), 1024);
    }

    #[test]
    fn load_copies_at_address_zero() {
        let mut memory = Memory::default();
        memory.load(&[0x01, 0x10, 0x0F, 0x00]).unwrap();

        assert_eq!(memory.get(0), Ok(0x01));
        assert_eq!(memory.get(3), Ok(0x00));
        assert_eq!(memory.get(4), Ok(0));
    }

    #[test]
    fn load_rejects_oversized_images() {
        let mut memory = Memory::new(256);
        let image = vec![0; 257];

        assert!(memory.load(&image).is_err());
    }
}
