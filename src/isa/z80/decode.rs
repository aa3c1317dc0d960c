use tracing::{debug, warn};

use crate::config::{CodecConfig, Undocumented};
use crate::decoder::{Decoded, Decoder};
use crate::error::DecodeError;
use crate::instructions::{Instruction, Mnemonic, Operand, TokenKind};
use crate::memory::Bus;
use crate::tables::{
    self, Index, ALU_OPS, BLOCK_OPS, CB_OPS, CONDS, IM_MODES, MISC_OPS, PAIRS, PREFIX_CB, PREFIX_ED, PREFIX_IX,
    PREFIX_IY, REGS, REG_M, ROT_OPS,
};

/// Single-instruction Z80 disassembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Z80Decoder {
    pub cfg: CodecConfig,
}

/// Prefix bytes seen so far. At most one DD/FD is consumed per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Base,
    Indexed(Index),
}

/// Octal fields `xx yyy zzz`, with `yyy` also split as `pp q`.
#[derive(Debug, Clone, Copy)]
struct Fields {
    x: u8,
    y: u8,
    z: u8,
    p: u8,
    q: u8,
}

impl Fields {
    fn of(code: u8) -> Self {
        let y = (code >> 3) & 7;
        Self { x: code >> 6, y, z: code & 7, p: y >> 1, q: y & 1 }
    }
}

/// Sequential reads starting at the instruction address.
struct Fetch<'a, B: Bus> {
    bus: &'a mut B,
    pc: u16,
}

impl<B: Bus> Fetch<'_, B> {
    fn byte(&mut self) -> Result<u8, DecodeError> {
        let addr = self.pc;
        let b = self.bus.read_u8(addr).map_err(|source| DecodeError::Bus { addr, source })?;
        self.pc = addr.wrapping_add(1);
        Ok(b)
    }

    fn word(&mut self) -> Result<u16, DecodeError> {
        let lo = self.byte()?;
        let hi = self.byte()?;
        Ok(u16::from_le_bytes([lo, hi]))
    }

    fn disp(&mut self) -> Result<i8, DecodeError> {
        Ok(self.byte()? as i8)
    }

    fn undefined(&self, prefix: u8, code: u8) -> DecodeError {
        DecodeError::Undefined { prefix, code, next: self.pc }
    }
}

/// 8-bit register field; slot 6 reads a displacement under a prefix.
fn reg<B: Bus>(f: &mut Fetch<'_, B>, r: u8, index: Option<Index>) -> Result<Operand, DecodeError> {
    Ok(match (r, index) {
        (REG_M, Some(index)) => Operand::index(index, f.disp()?),
        (REG_M, None) => Operand::ind(TokenKind::Hl),
        _ => Operand::reg(tables::reg_table(index)[r as usize]),
    })
}

fn pair(p: u8, index: Option<Index>, use_af: bool) -> Operand {
    Operand::reg(tables::pair_table(index, use_af)[p as usize])
}

fn hl(index: Option<Index>) -> Operand {
    Operand::reg(index.map_or(TokenKind::Hl, Index::pair))
}

fn cond(y: u8) -> Operand {
    Operand::reg(CONDS[y as usize])
}

/// Relative branch target: the address after the displacement byte plus the displacement.
fn rel<B: Bus>(f: &mut Fetch<'_, B>) -> Result<Operand, DecodeError> {
    let d = f.disp()?;
    Ok(Operand::word(f.pc.wrapping_add(d as i16 as u16)))
}

fn is_half(op: &Operand) -> bool {
    matches!(op.kind(), TokenKind::Ixh | TokenKind::Ixl | TokenKind::Iyh | TokenKind::Iyl)
}

impl Z80Decoder {
    pub fn new(cfg: CodecConfig) -> Self {
        Self { cfg }
    }

    fn step<B: Bus>(&self, f: &mut Fetch<'_, B>) -> Result<Instruction, DecodeError> {
        let mut state = State::Base;
        loop {
            let code = f.byte()?;
            match (state, code) {
                // The second prefix is left for the next instruction
                (State::Indexed(index), PREFIX_IX | PREFIX_IY | PREFIX_ED) => {
                    return Err(DecodeError::PrefixConflict {
                        prefix: index.prefix(),
                        code,
                        next: f.pc.wrapping_sub(1),
                    });
                }
                (State::Base, PREFIX_ED) => return self.decode_ed(f),
                (State::Base, PREFIX_CB) => return self.decode_cb(f, None),
                (State::Indexed(index), PREFIX_CB) => return self.decode_cb(f, Some(index)),
                (State::Base, _) => match Index::from_prefix(code) {
                    Some(index) => state = State::Indexed(index),
                    None => return self.decode_base(f, code, None),
                },
                (State::Indexed(index), _) => return self.decode_base(f, code, Some(index)),
            }
        }
    }

    /// Unprefixed opcode space, with HL replaced by IX/IY under a prefix.
    /// Opcodes that never touch HL ignore the prefix.
    fn decode_base<B: Bus>(
        &self,
        f: &mut Fetch<'_, B>,
        code: u8,
        index: Option<Index>,
    ) -> Result<Instruction, DecodeError> {
        use Mnemonic as M;
        use TokenKind as T;

        let Fields { x, y, z, p, q } = Fields::of(code);
        let inst = match (x, z) {
            (0, 0) => match y {
                0 => Instruction::new(M::Nop),
                1 => Instruction::binary(M::Ex, Operand::reg(T::Af), Operand::reg(T::AfAlt)),
                2 => Instruction::unary(M::Djnz, rel(f)?),
                3 => Instruction::unary(M::Jr, rel(f)?),
                _ => Instruction::binary(M::Jr, cond(y - 4), rel(f)?),
            },
            (0, 1) if q == 0 => Instruction::binary(M::Ld, pair(p, index, false), Operand::word(f.word()?)),
            (0, 1) => Instruction::binary(M::Add, hl(index), pair(p, index, false)),
            (0, 2) => match y {
                0 => Instruction::binary(M::Ld, Operand::ind(T::Bc), Operand::reg(T::A)),
                1 => Instruction::binary(M::Ld, Operand::reg(T::A), Operand::ind(T::Bc)),
                2 => Instruction::binary(M::Ld, Operand::ind(T::De), Operand::reg(T::A)),
                3 => Instruction::binary(M::Ld, Operand::reg(T::A), Operand::ind(T::De)),
                4 => Instruction::binary(M::Ld, Operand::addr(f.word()?), hl(index)),
                5 => Instruction::binary(M::Ld, hl(index), Operand::addr(f.word()?)),
                6 => Instruction::binary(M::Ld, Operand::addr(f.word()?), Operand::reg(T::A)),
                _ => Instruction::binary(M::Ld, Operand::reg(T::A), Operand::addr(f.word()?)),
            },
            (0, 3) => Instruction::unary(if q == 0 { M::Inc } else { M::Dec }, pair(p, index, false)),
            (0, 4) => Instruction::unary(M::Inc, reg(f, y, index)?),
            (0, 5) => Instruction::unary(M::Dec, reg(f, y, index)?),
            (0, 6) => {
                let dst = reg(f, y, index)?;
                Instruction::binary(M::Ld, dst, Operand::byte(f.byte()?))
            }
            (0, _) => Instruction::new(MISC_OPS[y as usize]),
            (1, _) if y == REG_M && z == REG_M => Instruction::new(M::Halt),
            (1, _) => {
                // Next to (IX+d) the other side keeps plain H and L
                let mem = y == REG_M || z == REG_M;
                let pick = |r: u8| if r == REG_M || !mem { index } else { None };
                let dst = reg(f, y, pick(y))?;
                let src = reg(f, z, pick(z))?;
                Instruction::binary(M::Ld, dst, src)
            }
            (2, _) => Instruction::binary(ALU_OPS[y as usize], Operand::reg(T::A), reg(f, z, index)?),
            (_, 0) => Instruction::unary(M::Ret, cond(y)),
            (_, 1) => match (q, p) {
                (0, _) => Instruction::unary(M::Pop, pair(p, index, true)),
                (_, 0) => Instruction::new(M::Ret),
                (_, 1) => Instruction::new(M::Exx),
                (_, 2) => Instruction::unary(M::Jp, Operand::ind(hl(index).kind())),
                _ => Instruction::binary(M::Ld, Operand::reg(T::Sp), hl(index)),
            },
            (_, 2) => Instruction::binary(M::Jp, cond(y), Operand::word(f.word()?)),
            (_, 3) => match y {
                0 => Instruction::unary(M::Jp, Operand::word(f.word()?)),
                2 => Instruction::binary(M::Out, Operand::port(f.byte()?), Operand::reg(T::A)),
                3 => Instruction::binary(M::In, Operand::reg(T::A), Operand::port(f.byte()?)),
                4 => Instruction::binary(M::Ex, Operand::ind(T::Sp), hl(index)),
                5 => Instruction::binary(M::Ex, Operand::reg(T::De), Operand::reg(T::Hl)),
                6 => Instruction::new(M::Di),
                7 => Instruction::new(M::Ei),
                // CB is routed by the prefix state machine
                _ => return Err(f.undefined(index.map_or(0, Index::prefix), code)),
            },
            (_, 4) => Instruction::binary(M::Call, cond(y), Operand::word(f.word()?)),
            (_, 5) if q == 0 => Instruction::unary(M::Push, pair(p, index, true)),
            (_, 5) if p == 0 => Instruction::unary(M::Call, Operand::word(f.word()?)),
            (_, 5) => return Err(f.undefined(index.map_or(0, Index::prefix), code)),
            (_, 6) => Instruction::binary(ALU_OPS[y as usize], Operand::reg(T::A), Operand::byte(f.byte()?)),
            _ => Instruction::unary(M::Rst, Operand::byte(y << 3)),
        };

        if let Some(index) = index {
            if !self.cfg.allows(Undocumented::INDEX_HALVES) && inst.operands.iter().any(is_half) {
                return Err(f.undefined(index.prefix(), code));
            }
        }
        Ok(inst)
    }

    fn decode_ed<B: Bus>(&self, f: &mut Fetch<'_, B>) -> Result<Instruction, DecodeError> {
        use Mnemonic as M;
        use TokenKind as T;

        let code = f.byte()?;
        let Fields { x, y, z, p, q } = Fields::of(code);
        let io_c = self.cfg.allows(Undocumented::IO_C);
        let inst = match (x, z) {
            (1, 0) if y == REG_M && io_c => Instruction::unary(M::In, Operand::ind(T::C)),
            (1, 0) if y != REG_M => Instruction::binary(M::In, Operand::reg(REGS[y as usize]), Operand::ind(T::C)),
            (1, 1) if y == REG_M && io_c => Instruction::binary(M::Out, Operand::ind(T::C), Operand::digit(0)),
            (1, 1) if y != REG_M => Instruction::binary(M::Out, Operand::ind(T::C), Operand::reg(REGS[y as usize])),
            (1, 2) => {
                let m = if q == 0 { M::Sbc } else { M::Adc };
                Instruction::binary(m, Operand::reg(T::Hl), Operand::reg(PAIRS[p as usize]))
            }
            (1, 3) if q == 0 => Instruction::binary(M::Ld, Operand::addr(f.word()?), Operand::reg(PAIRS[p as usize])),
            (1, 3) => Instruction::binary(M::Ld, Operand::reg(PAIRS[p as usize]), Operand::addr(f.word()?)),
            // Mirrors across the whole column
            (1, 4) => Instruction::new(M::Neg),
            (1, 5) => Instruction::new(if y == 1 { M::Reti } else { M::Retn }),
            (1, 6) => {
                let mode = match IM_MODES[(y & 3) as usize] {
                    Some(mode) => Operand::digit(mode),
                    None => Operand::reg(T::Undefined),
                };
                Instruction::unary(M::Im, mode)
            }
            (1, 7) => match y {
                0 => Instruction::binary(M::Ld, Operand::reg(T::I), Operand::reg(T::A)),
                1 => Instruction::binary(M::Ld, Operand::reg(T::R), Operand::reg(T::A)),
                2 => Instruction::binary(M::Ld, Operand::reg(T::A), Operand::reg(T::I)),
                3 => Instruction::binary(M::Ld, Operand::reg(T::A), Operand::reg(T::R)),
                4 => Instruction::new(M::Rrd),
                5 => Instruction::new(M::Rld),
                _ => return Err(f.undefined(PREFIX_ED, code)),
            },
            (2, 0..=3) if y >= 4 => Instruction::new(BLOCK_OPS[(y - 4) as usize][z as usize]),
            _ => return Err(f.undefined(PREFIX_ED, code)),
        };
        Ok(inst)
    }

    /// CB page. Indexed forms read the displacement before the opcode.
    fn decode_cb<B: Bus>(&self, f: &mut Fetch<'_, B>, index: Option<Index>) -> Result<Instruction, DecodeError> {
        let disp = index.map(|_| f.disp()).transpose()?;
        let code = f.byte()?;
        let Fields { x, y, z, .. } = Fields::of(code);
        let prefix = index.map_or(PREFIX_CB, Index::prefix);

        let target = match index.zip(disp) {
            Some((index, disp)) => Operand::index(index, disp),
            None => reg(f, z, None)?,
        };
        // DD CB d op with op's register field other than 6
        let copy = index.is_some() && z != REG_M;

        let inst = match x {
            0 => {
                let m = ROT_OPS[y as usize];
                if m == Mnemonic::Sl1 && !self.cfg.allows(Undocumented::SL1) {
                    return Err(f.undefined(prefix, code));
                }
                if copy {
                    if !self.cfg.allows(Undocumented::INDEX_CB_COPY) {
                        return Err(f.undefined(prefix, code));
                    }
                    Instruction::binary(m, target, Operand::reg(REGS[z as usize]))
                } else {
                    Instruction::unary(m, target)
                }
            }
            1 => Instruction::binary(Mnemonic::Bit, Operand::digit(y), target),
            _ if copy => return Err(f.undefined(prefix, code)),
            _ => Instruction::binary(CB_OPS[x as usize], Operand::digit(y), target),
        };
        Ok(inst)
    }
}

impl Decoder for Z80Decoder {
    fn decode<B: Bus>(&self, bus: &mut B, addr: u16) -> Result<Decoded, DecodeError> {
        let mut f = Fetch { bus, pc: addr };
        let result = self.step(&mut f).map(|inst| Decoded { inst, next: f.pc });
        match &result {
            Ok(d) => debug!(addr, next = d.next, "decoded {}", d.inst),
            Err(err) => warn!(addr, "undecodable: {err}"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::LinearMemory;
    use pretty_assertions::assert_eq;

    fn decode_with(cfg: CodecConfig, bytes: &[u8]) -> Result<Decoded, DecodeError> {
        let mut mem = LinearMemory::new();
        mem.load(0x100, bytes);
        Z80Decoder::new(cfg).decode(&mut mem, 0x100)
    }

    fn text(bytes: &[u8]) -> (String, u16) {
        let d = decode_with(CodecConfig::default(), bytes).unwrap();
        (d.inst.to_string(), d.width(0x100))
    }

    #[test]
    fn base_page() {
        assert_eq!(text(&[0x00]), ("NOP".into(), 1));
        assert_eq!(text(&[0x08]), ("EX AF,AF'".into(), 1));
        assert_eq!(text(&[0x21, 0x34, 0x12]), ("LD HL,$1234".into(), 3));
        assert_eq!(text(&[0x3A, 0x34, 0x12]), ("LD A,($1234)".into(), 3));
        assert_eq!(text(&[0x76]), ("HALT".into(), 1));
        assert_eq!(text(&[0x46]), ("LD B,(HL)".into(), 1));
        assert_eq!(text(&[0x97]), ("SUB A,A".into(), 1));
        assert_eq!(text(&[0xFE, 0x20]), ("CP A,$20".into(), 2));
        assert_eq!(text(&[0xDB, 0x7F]), ("IN A,($7F)".into(), 2));
        assert_eq!(text(&[0xF1]), ("POP AF".into(), 1));
        assert_eq!(text(&[0xFF]), ("RST $38".into(), 1));
        assert_eq!(text(&[0xE9]), ("JP (HL)".into(), 1));
    }

    #[test]
    fn relative_targets() {
        assert_eq!(text(&[0x18, 0x00]), ("JR $0102".into(), 2));
        assert_eq!(text(&[0x38, 0xFE]), ("JR C,$0100".into(), 2));
        assert_eq!(text(&[0x10, 0x80]), ("DJNZ $0082".into(), 2));
    }

    #[test]
    fn indexed_forms() {
        assert_eq!(text(&[0xDD, 0x7E, 0x05]), ("LD A,(IX+$05)".into(), 3));
        assert_eq!(text(&[0xFD, 0x74, 0xFB]), ("LD (IY-$05),H".into(), 3));
        assert_eq!(text(&[0xDD, 0x65]), ("LD IXH,IXL".into(), 2));
        assert_eq!(text(&[0xFD, 0x36, 0x01, 0x02]), ("LD (IY+$01),$02".into(), 4));
        assert_eq!(text(&[0xFD, 0xE9]), ("JP (IY)".into(), 2));
        assert_eq!(text(&[0xDD, 0xEB]), ("EX DE,HL".into(), 2));
    }

    #[test]
    fn ed_page() {
        assert_eq!(text(&[0xED, 0x4D]), ("RETI".into(), 2));
        assert_eq!(text(&[0xED, 0x55]), ("RETN".into(), 2));
        assert_eq!(text(&[0xED, 0x6C]), ("NEG".into(), 2));
        assert_eq!(text(&[0xED, 0x4E]), ("IM ?".into(), 2));
        assert_eq!(text(&[0xED, 0x5E]), ("IM 2".into(), 2));
        assert_eq!(text(&[0xED, 0x78]), ("IN A,(C)".into(), 2));
        assert_eq!(text(&[0xED, 0x71]), ("OUT (C),0".into(), 2));
        assert_eq!(text(&[0xED, 0xB0]), ("LDIR".into(), 2));
        assert_eq!(text(&[0xED, 0x4B, 0x00, 0x80]), ("LD BC,($8000)".into(), 4));
    }

    #[test]
    fn cb_page() {
        assert_eq!(text(&[0xCB, 0x37]), ("SL1 A".into(), 2));
        assert_eq!(text(&[0xCB, 0x46]), ("BIT 0,(HL)".into(), 2));
        assert_eq!(text(&[0xDD, 0xCB, 0x02, 0xFE]), ("SET 7,(IX+$02)".into(), 4));
        assert_eq!(text(&[0xFD, 0xCB, 0xFF, 0x17]), ("RL (IY-$01),A".into(), 4));
        assert_eq!(text(&[0xDD, 0xCB, 0x00, 0x41]), ("BIT 0,(IX)".into(), 4));
    }

    #[test]
    fn undefined_and_conflicts_report_resume_point() {
        let err = decode_with(CodecConfig::default(), &[0xED, 0x00]).unwrap_err();
        assert_eq!(err.to_string(), "$ED00?");
        assert_eq!(err.resume(), Some(0x102));

        let err = decode_with(CodecConfig::default(), &[0xDD, 0xFD, 0x00]).unwrap_err();
        assert_eq!(err.to_string(), "$DDFD?");
        assert_eq!(err.resume(), Some(0x101));

        let err = decode_with(CodecConfig::default(), &[0xDD, 0xCB, 0x01, 0x80]).unwrap_err();
        assert_eq!(err.to_string(), "$DD80?");
        assert_eq!(err.resume(), Some(0x104));
    }

    #[test]
    fn strict_config_hides_undocumented() {
        let strict = CodecConfig::strict();
        assert!(decode_with(strict, &[0xCB, 0x30]).is_err());
        assert!(decode_with(strict, &[0xDD, 0x44]).is_err());
        assert!(decode_with(strict, &[0xED, 0x70]).is_err());
        assert!(decode_with(strict, &[0xDD, 0xCB, 0x00, 0x00]).is_err());
        assert!(decode_with(strict, &[0xDD, 0x46, 0x00]).is_ok());
    }
}
