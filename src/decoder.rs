use crate::error::DecodeError;
use crate::instructions::Instruction;
use crate::memory::Bus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub inst: Instruction,
    /// Address of the byte after the instruction.
    pub next: u16,
}

impl Decoded {
    /// Bytes consumed when decoding started at `addr`.
    pub fn width(&self, addr: u16) -> u16 {
        self.next.wrapping_sub(addr)
    }
}

pub trait Decoder {
    fn decode<B: Bus>(&self, bus: &mut B, addr: u16) -> Result<Decoded, DecodeError>;
}
