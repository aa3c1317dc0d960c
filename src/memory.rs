use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Byte access to the target's 16-bit address space.
pub trait Bus {
    fn read_u8(&mut self, addr: u16) -> Result<u8>;
    fn write_u8(&mut self, addr: u16, val: u8) -> Result<()>;
}

pub const ADDRESS_SPACE: usize = 0x1_0000;

/// A flat 64 KiB RAM image.
#[derive(Clone, Serialize, Deserialize)]
pub struct LinearMemory {
    pub mem: Vec<u8>,
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearMemory {
    pub fn new() -> Self {
        Self {
            mem: vec![0; ADDRESS_SPACE],
        }
    }

    /// Copy `bytes` in at `base`, wrapping past $FFFF.
    pub fn load(&mut self, base: u16, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            self.mem[base.wrapping_add(i as u16) as usize] = b;
        }
    }

    /// Copy a whole image in at `base`; it must end at or below $FFFF.
    pub fn load_image(&mut self, base: u16, bytes: &[u8]) -> Result<()> {
        anyhow::ensure!(
            base as usize + bytes.len() <= ADDRESS_SPACE,
            "image at ${base:04X} runs past $FFFF ({} bytes)",
            bytes.len()
        );
        self.load(base, bytes);
        Ok(())
    }

    pub fn bytes(&self, start: u16, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.mem[start.wrapping_add(i as u16) as usize])
            .collect()
    }
}

impl Bus for LinearMemory {
    fn read_u8(&mut self, addr: u16) -> Result<u8> {
        Ok(self.mem[addr as usize])
    }
    fn write_u8(&mut self, addr: u16, val: u8) -> Result<()> {
        self.mem[addr as usize] = val;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut mem = LinearMemory::new();
        mem.load(0xFFFF, &[1, 2, 3]);
        assert_eq!(mem.read_u8(0xFFFF).unwrap(), 1);
        assert_eq!(mem.bytes(0x0000, 2), vec![2, 3]);
    }

    #[test]
    fn image_must_end_below_top_of_memory() {
        let mut mem = LinearMemory::new();
        mem.load_image(0xFFFE, &[1, 2]).unwrap();
        assert_eq!(mem.bytes(0xFFFE, 2), vec![1, 2]);

        let err = mem.load_image(0xFFFE, &[7, 8, 9]).unwrap_err();
        assert_eq!(err.to_string(), "image at $FFFE runs past $FFFF (3 bytes)");
        assert_eq!(mem.read_u8(0x0000).unwrap(), 0);
    }
}
