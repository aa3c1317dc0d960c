//! Canonical text form of instructions.
//!
//! Immediates print by their format hint: `$XX` bytes, `$XXXX` words, bare
//! decimal digits for bit numbers and interrupt modes. Index displacements
//! print as `+$XX` / `-$XX` and are omitted when zero.

use std::fmt;

use crate::decoder::Decoded;
use crate::instructions::{Format, Instruction, Mnemonic, Operand, TokenKind};

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = self.token;
        if token.indirect {
            f.write_str("(")?;
        }
        match token.kind {
            TokenKind::Immediate => match token.format {
                Format::Digit => write!(f, "{}", self.value)?,
                Format::Byte => write!(f, "${:02X}", self.value)?,
                Format::Word => write!(f, "${:04X}", self.value)?,
            },
            kind => {
                f.write_str(kind.name())?;
                let disp = self.value as i16;
                if disp != 0 {
                    let sign = if disp < 0 { '-' } else { '+' };
                    write!(f, "{sign}${:02X}", disp.unsigned_abs())?;
                }
            }
        }
        if token.indirect {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.name())?;
        for (i, op) in self.operands[..self.arity()].iter().enumerate() {
            f.write_str(if i == 0 { " " } else { "," })?;
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

/// `XXXX:  TEXT`, the listing line used by the monitor and the range dump.
pub fn fmt_decoded(addr: u16, d: &Decoded) -> String {
    format!("{addr:04X}:  {}", d.inst)
}

/// Space-separated hex bytes, e.g. `DD 21 34 12`.
pub fn fmt_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Index;
    use pretty_assertions::assert_eq;

    #[test]
    fn operand_forms() {
        assert_eq!(Operand::index(Index::Ix, 5).to_string(), "(IX+$05)");
        assert_eq!(Operand::index(Index::Iy, -128).to_string(), "(IY-$80)");
        assert_eq!(Operand::index(Index::Ix, 0).to_string(), "(IX)");
        assert_eq!(Operand::addr(0xBABE).to_string(), "($BABE)");
        assert_eq!(Operand::port(0x10).to_string(), "($10)");
        assert_eq!(Operand::digit(7).to_string(), "7");
        assert_eq!(Operand::reg(TokenKind::AfAlt).to_string(), "AF'");
        assert_eq!(Operand::reg(TokenKind::Undefined).to_string(), "?");
    }

    #[test]
    fn instruction_text() {
        let inst = Instruction::binary(Mnemonic::Ld, Operand::ind(TokenKind::Hl), Operand::byte(5));
        assert_eq!(inst.to_string(), "LD (HL),$05");
        assert_eq!(Instruction::new(Mnemonic::Ldir).to_string(), "LDIR");
        assert_eq!(Instruction::default().to_string(), "?");
    }

    #[test]
    fn listing_line() {
        let d = Decoded { inst: Instruction::new(Mnemonic::Nop), next: 0x8001 };
        assert_eq!(fmt_decoded(0x8000, &d), "8000:  NOP");
        assert_eq!(fmt_bytes(&[0xDD, 0x21, 0x34, 0x12]), "DD 21 34 12");
    }
}
