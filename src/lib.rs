pub mod config;
pub mod decoder;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod instructions;
pub mod memory;
pub mod monitor;
pub mod parser;
pub mod tables;

pub mod isa {
    pub mod z80; // Z80 with the common undocumented extensions
}

pub use config::{CodecConfig, Undocumented};
pub use decoder::{Decoded, Decoder};
pub use encoder::{Code, Encoder};
pub use error::{AsmError, DecodeError, ParseError};
pub use instructions::{Instruction, Mnemonic, Operand, TokenKind};
pub use isa::z80::{Z80Decoder, Z80Encoder};
pub use memory::{Bus, LinearMemory};
pub use monitor::Monitor;
