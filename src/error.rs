use crate::instructions::{Mnemonic, Operand};

/// Lexical errors from the operand and instruction parsers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A labeled argument: `op: FOO?`, `char: ab?`.
    #[error("{field}: {text}?")]
    Field { field: &'static str, text: String },
    #[error("{0}?")]
    Operand(String),
}

impl ParseError {
    pub fn field(field: &'static str, text: &str) -> Self {
        ParseError::Field { field, text: text.to_string() }
    }

    pub fn operand(text: &str) -> Self {
        ParseError::Operand(text.to_string())
    }
}

/// Shape and range errors from the encoder. Nothing is written when one is returned.
#[derive(thiserror::Error, Debug)]
pub enum AsmError {
    #[error("op?")]
    NoMnemonic,
    #[error("op: {0}?")]
    Unsupported(Mnemonic),
    #[error("arg?")]
    MissingOperand,
    #[error("{0}?")]
    Operand(Operand),
    #[error("Bus error at ${addr:04X}: {source}")]
    Bus {
        addr: u16,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// A second prefix byte straight after DD/FD.
    #[error("${prefix:02X}{code:02X}?")]
    PrefixConflict { prefix: u8, code: u8, next: u16 },
    #[error("${prefix:02X}{code:02X}?")]
    Undefined { prefix: u8, code: u8, next: u16 },
    #[error("Bus error at ${addr:04X}: {source}")]
    Bus {
        addr: u16,
        #[source]
        source: anyhow::Error,
    },
}

impl DecodeError {
    /// Address at which a disassembly sweep may continue.
    pub fn resume(&self) -> Option<u16> {
        match self {
            DecodeError::PrefixConflict { next, .. } | DecodeError::Undefined { next, .. } => Some(*next),
            DecodeError::Bus { .. } => None,
        }
    }
}
