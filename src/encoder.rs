use crate::error::AsmError;
use crate::instructions::Instruction;
use crate::memory::Bus;

/// Longest encoding: prefix, opcode and two payload bytes.
pub const MAX_LEN: usize = 4;

/// Machine code for one instruction, built before anything touches the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Code {
    bytes: [u8; MAX_LEN],
    len: u8,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, byte: u8) -> &mut Self {
        self.bytes[self.len as usize] = byte;
        self.len += 1;
        self
    }

    /// Little-endian 16-bit payload.
    pub fn push_word(&mut self, word: u16) -> &mut Self {
        let [lo, hi] = word.to_le_bytes();
        self.push(lo).push(hi)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn len(&self) -> u8 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub trait Encoder {
    /// Encode without side effects; `addr` is where the code will live.
    fn assemble(&self, inst: &Instruction, addr: u16) -> Result<Code, AsmError>;

    /// Encode and write at `addr`, returning the number of bytes written.
    /// On error nothing is written.
    fn encode<B: Bus>(&self, bus: &mut B, inst: &Instruction, addr: u16) -> Result<u8, AsmError> {
        let code = self.assemble(inst, addr)?;
        for (i, &b) in code.as_slice().iter().enumerate() {
            let at = addr.wrapping_add(i as u16);
            bus.write_u8(at, b).map_err(|source| AsmError::Bus { addr: at, source })?;
        }
        Ok(code.len())
    }
}
