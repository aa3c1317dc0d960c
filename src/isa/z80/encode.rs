use tracing::{debug, warn};

use crate::config::{CodecConfig, Undocumented};
use crate::encoder::{Code, Encoder};
use crate::error::AsmError;
use crate::instructions::{Instruction, Mnemonic, Operand, TokenKind};
use crate::tables::{
    self, Index, ALU_OPS, CB_OPS, CONDS, FIXED_OPS, IM_MODES, PAIRS, PREFIX_CB, PREFIX_ED, REG_M, ROT_OPS,
};

/// Single-instruction Z80 assembler.
#[derive(Debug, Clone, Copy, Default)]
pub struct Z80Encoder {
    pub cfg: CodecConfig,
}

/// 8-bit register operand resolved to its 3-bit field.
#[derive(Debug, Clone, Copy)]
struct Reg8 {
    code: u8,
    index: Option<Index>,
    disp: Option<u8>,
}

impl Reg8 {
    fn is_mem(&self) -> bool {
        self.code == REG_M
    }

    /// IXH/IXL/IYH/IYL.
    fn is_half(&self) -> bool {
        self.index.is_some() && self.disp.is_none()
    }
}

fn bad(op: &Operand) -> AsmError {
    AsmError::Operand(*op)
}

fn need(op: &Operand) -> Result<&Operand, AsmError> {
    if op.is_invalid() {
        Err(AsmError::MissingOperand)
    } else {
        Ok(op)
    }
}

fn none(op: &Operand) -> Result<(), AsmError> {
    if op.is_invalid() {
        Ok(())
    } else {
        Err(bad(op))
    }
}

fn byte(op: &Operand) -> Result<u8, AsmError> {
    u8::try_from(op.value).map_err(|_| bad(op))
}

/// `(BC)`, `(DE)`, `(C)`, `(SP)`... with no displacement.
fn is_ptr(op: &Operand, kind: TokenKind) -> bool {
    op.is_ind(kind) && op.value == 0
}

/// HL, IX or IY as a 16-bit operand.
fn hl_like(op: &Operand) -> Option<Option<Index>> {
    match op.kind() {
        _ if op.token.indirect => None,
        TokenKind::Hl => Some(None),
        TokenKind::Ix => Some(Some(Index::Ix)),
        TokenKind::Iy => Some(Some(Index::Iy)),
        _ => None,
    }
}

/// Register pair field; IX/IY take HL's slot and bring their prefix.
fn pair(op: &Operand, use_af: bool) -> Option<(u8, Option<Index>)> {
    if op.token.indirect {
        return None;
    }
    let index = op.kind().index();
    tables::find(tables::pair_table(index, use_af), op.kind()).map(|p| (p, index))
}

/// Condition field, limited to the first `limit` entries.
fn cond(op: &Operand, limit: u8) -> Option<u8> {
    if op.token.indirect {
        return None;
    }
    tables::find(&CONDS, op.kind()).filter(|&c| c < limit)
}

fn indexed(index: Option<Index>, opcode: u8) -> Code {
    let mut code = Code::new();
    if let Some(index) = index {
        code.push(index.prefix());
    }
    code.push(opcode);
    code
}

fn one(opcode: u8) -> Code {
    indexed(None, opcode)
}

fn ed(opcode: u8) -> Code {
    let mut code = Code::new();
    code.push(PREFIX_ED).push(opcode);
    code
}

fn with_word(mut code: Code, word: u16) -> Code {
    code.push_word(word);
    code
}

/// `[prefix] opcode [disp]`
fn reg_op(r: Reg8, opcode: u8) -> Code {
    let mut code = indexed(r.index, opcode);
    if let Some(disp) = r.disp {
        code.push(disp);
    }
    code
}

/// `LD r,r'` with the prefix rules: one index family, one memory side, and
/// no plain H/L/(HL) next to IXH/IXL.
fn ld_reg_reg(d: Reg8, s: Reg8) -> Option<Code> {
    if d.is_mem() && s.is_mem() {
        return None;
    }
    let index = match (d.index, s.index) {
        (Some(x), Some(y)) if x != y => return None,
        (x, y) => x.or(y),
    };
    let disp = d.disp.or(s.disp);
    if disp.is_some() {
        if d.index.is_some() && s.index.is_some() {
            return None;
        }
    } else if index.is_some() && [d, s].iter().any(|r| r.index.is_none() && (4..=REG_M).contains(&r.code)) {
        return None;
    }
    let mut code = indexed(index, 0x40 | d.code << 3 | s.code);
    if let Some(disp) = disp {
        code.push(disp);
    }
    Some(code)
}

impl Z80Encoder {
    pub fn new(cfg: CodecConfig) -> Self {
        Self { cfg }
    }

    fn allow(&self, flag: Undocumented, op: &Operand) -> Result<(), AsmError> {
        if self.cfg.allows(flag) {
            Ok(())
        } else {
            Err(bad(op))
        }
    }

    fn reg8(&self, op: &Operand) -> Option<Reg8> {
        let kind = op.kind();
        if op.token.indirect {
            return match kind {
                TokenKind::Hl if op.value == 0 => Some(Reg8 { code: REG_M, index: None, disp: None }),
                TokenKind::Ix | TokenKind::Iy => Some(Reg8 {
                    code: REG_M,
                    index: kind.index(),
                    disp: Some(op.disp()? as u8),
                }),
                _ => None,
            };
        }
        let index = kind.index();
        if index.is_some() && !self.cfg.allows(Undocumented::INDEX_HALVES) {
            return None;
        }
        tables::find(tables::reg_table(index), kind)
            .filter(|&code| code != REG_M)
            .map(|code| Reg8 { code, index, disp: None })
    }

    /// B, C, D, E, H, L or A with no prefix involved.
    fn plain_reg(&self, op: &Operand) -> Result<u8, AsmError> {
        self.reg8(op)
            .filter(|r| r.index.is_none() && !r.is_mem())
            .map(|r| r.code)
            .ok_or_else(|| bad(op))
    }

    fn dispatch(&self, inst: &Instruction, addr: u16) -> Result<Code, AsmError> {
        use Mnemonic::*;
        let [a, b] = &inst.operands;
        match inst.mnemonic {
            Add | Adc | Sub | Sbc | And | Xor | Or | Cp => self.alu(inst.mnemonic, a, b),
            Rlc | Rrc | Rl | Rr | Sla | Sra | Sl1 | Srl => self.rot(inst.mnemonic, a, b),
            Bit | Res | Set => self.bit(inst.mnemonic, a, b),
            Jr | Djnz => self.rel(inst.mnemonic, a, b, addr),
            Jp | Call => self.jump(inst.mnemonic, a, b),
            Ld => self.ld(need(a)?, need(b)?),
            Inc | Dec => self.inc_dec(inst.mnemonic, a, b),
            Ex => self.ex(need(a)?, need(b)?),
            Im => self.im(a, b),
            In => self.input(a, b),
            Out => self.output(need(a)?, need(b)?),
            Push | Pop => self.stack(inst.mnemonic, a, b),
            Ret => self.ret(a, b),
            Rst => self.rst(a, b),
            Invalid => Err(AsmError::NoMnemonic),
            m => self.fixed(m, a, b),
        }
    }

    fn fixed(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let &(_, is_ed, opcode) = FIXED_OPS
            .iter()
            .find(|(f, _, _)| *f == m)
            .ok_or(AsmError::Unsupported(m))?;
        none(a)?;
        none(b)?;
        Ok(if is_ed { ed(opcode) } else { one(opcode) })
    }

    /// `op A,src`, `op src`, or the 16-bit `ADD/ADC/SBC HL,rr`.
    fn alu(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let alu = tables::find(&ALU_OPS, m).ok_or(AsmError::Unsupported(m))?;
        let a = need(a)?;
        let src = if b.is_invalid() {
            a
        } else if a.is(TokenKind::A) {
            b
        } else {
            return self.alu16(m, a, b);
        };
        if src.is_imm() {
            let mut code = one(0xC6 | alu << 3);
            code.push(byte(src)?);
            return Ok(code);
        }
        let r = self.reg8(src).ok_or_else(|| bad(src))?;
        Ok(reg_op(r, 0x80 | alu << 3 | r.code))
    }

    fn alu16(&self, m: Mnemonic, dst: &Operand, src: &Operand) -> Result<Code, AsmError> {
        let index = hl_like(dst).ok_or_else(|| bad(dst))?;
        match m {
            Mnemonic::Add => {
                let (p, src_index) = pair(src, false).ok_or_else(|| bad(src))?;
                // ADD IX,IX is fine; ADD IX,HL and ADD HL,IX are not
                if p == 2 && src_index != index {
                    return Err(bad(src));
                }
                Ok(indexed(index, 0x09 | p << 4))
            }
            Mnemonic::Adc | Mnemonic::Sbc if index.is_none() => {
                let p = tables::find(&PAIRS, src.kind())
                    .filter(|_| !src.token.indirect)
                    .ok_or_else(|| bad(src))?;
                let base = if m == Mnemonic::Adc { 0x4A } else { 0x42 };
                Ok(ed(base | p << 4))
            }
            _ => Err(bad(dst)),
        }
    }

    fn rot(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let rot = tables::find(&ROT_OPS, m).ok_or(AsmError::Unsupported(m))?;
        if m == Mnemonic::Sl1 && !self.cfg.allows(Undocumented::SL1) {
            return Err(AsmError::Unsupported(m));
        }
        let r = self.cb_target(need(a)?)?;
        self.cb(r, rot << 3, b)
    }

    fn bit(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let op = tables::find(&CB_OPS, m).ok_or(AsmError::Unsupported(m))?;
        let n = need(a)?;
        if !n.is_imm() || n.value > 7 {
            return Err(bad(n));
        }
        let r = self.cb_target(need(b)?)?;
        self.cb(r, op << 6 | (n.value as u8) << 3, &Operand::default())
    }

    fn cb_target(&self, op: &Operand) -> Result<Reg8, AsmError> {
        self.reg8(op).filter(|r| !r.is_half()).ok_or_else(|| bad(op))
    }

    /// CB-prefixed op. `copy` is the undocumented register that also receives
    /// the result of an indexed rotate.
    fn cb(&self, r: Reg8, op: u8, copy: &Operand) -> Result<Code, AsmError> {
        let mut code = Code::new();
        match (r.index, r.disp) {
            (Some(index), Some(disp)) => {
                let reg = if copy.is_invalid() {
                    REG_M
                } else {
                    self.allow(Undocumented::INDEX_CB_COPY, copy)?;
                    self.plain_reg(copy)?
                };
                // Displacement sits between CB and the opcode
                code.push(index.prefix()).push(PREFIX_CB).push(disp).push(op | reg);
            }
            _ => {
                none(copy)?;
                code.push(PREFIX_CB).push(op | r.code);
            }
        }
        Ok(code)
    }

    /// JR/DJNZ; the offset is relative to the following instruction.
    fn rel(&self, m: Mnemonic, a: &Operand, b: &Operand, addr: u16) -> Result<Code, AsmError> {
        let (cc, target) = if b.is_invalid() { (None, need(a)?) } else { (Some(a), b) };
        let opcode = match (m, cc) {
            (Mnemonic::Djnz, None) => 0x10,
            (Mnemonic::Djnz, Some(c)) => return Err(bad(c)),
            (_, None) => 0x18,
            (_, Some(c)) => 0x20 | cond(c, 4).ok_or_else(|| bad(c))? << 3,
        };
        if !target.is_imm() {
            return Err(bad(target));
        }
        let offset = target.value.wrapping_sub(addr.wrapping_add(2)) as i16;
        let disp = i8::try_from(offset).map_err(|_| bad(target))?;
        let mut code = one(opcode);
        code.push(disp as u8);
        Ok(code)
    }

    fn jump(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let a = need(a)?;
        let is_jp = m == Mnemonic::Jp;
        if b.is_invalid() {
            if a.is_imm() {
                return Ok(with_word(one(if is_jp { 0xC3 } else { 0xCD }), a.value));
            }
            // JP (HL), JP (IX), JP (IY)
            if is_jp && a.token.indirect && a.value == 0 {
                let direct = Operand::reg(a.kind());
                if let Some(index) = hl_like(&direct) {
                    return Ok(indexed(index, 0xE9));
                }
            }
            return Err(bad(a));
        }
        let cc = cond(a, 8).ok_or_else(|| bad(a))?;
        if !b.is_imm() {
            return Err(bad(b));
        }
        let base = if is_jp { 0xC2 } else { 0xC4 };
        Ok(with_word(one(base | cc << 3), b.value))
    }

    /// LD in all its shapes, most specific first.
    fn ld(&self, dst: &Operand, src: &Operand) -> Result<Code, AsmError> {
        use TokenKind::*;

        if dst.is(A) {
            if is_ptr(src, Bc) {
                return Ok(one(0x0A));
            }
            if is_ptr(src, De) {
                return Ok(one(0x1A));
            }
            if src.is_addr() {
                return Ok(with_word(one(0x3A), src.value));
            }
            if src.is(I) {
                return Ok(ed(0x57));
            }
            if src.is(R) {
                return Ok(ed(0x5F));
            }
        }
        if src.is(A) {
            if is_ptr(dst, Bc) {
                return Ok(one(0x02));
            }
            if is_ptr(dst, De) {
                return Ok(one(0x12));
            }
            if dst.is_addr() {
                return Ok(with_word(one(0x32), dst.value));
            }
            if dst.is(I) {
                return Ok(ed(0x47));
            }
            if dst.is(R) {
                return Ok(ed(0x4F));
            }
        }

        if let Some(index) = hl_like(dst) {
            if src.is_addr() {
                return Ok(with_word(indexed(index, 0x2A), src.value));
            }
        }
        if let Some(index) = hl_like(src) {
            if dst.is_addr() {
                return Ok(with_word(indexed(index, 0x22), dst.value));
            }
            if dst.is(Sp) {
                return Ok(indexed(index, 0xF9));
            }
        }

        if let Some(d) = self.reg8(dst) {
            if src.is_imm() {
                let mut code = reg_op(d, 0x06 | d.code << 3);
                code.push(byte(src)?);
                return Ok(code);
            }
            let s = self.reg8(src).ok_or_else(|| bad(src))?;
            return ld_reg_reg(d, s).ok_or_else(|| bad(src));
        }

        if let Some((p, index)) = pair(dst, false) {
            if src.is_imm() {
                return Ok(with_word(indexed(index, 0x01 | p << 4), src.value));
            }
            if src.is_addr() && index.is_none() {
                return Ok(with_word(ed(0x4B | p << 4), src.value));
            }
            return Err(bad(src));
        }
        if dst.is_addr() {
            if let Some((p, None)) = pair(src, false) {
                return Ok(with_word(ed(0x43 | p << 4), dst.value));
            }
            return Err(bad(src));
        }
        Err(bad(dst))
    }

    fn inc_dec(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let op = need(a)?;
        none(b)?;
        let dec = (m == Mnemonic::Dec) as u8;
        if let Some(r) = self.reg8(op) {
            return Ok(reg_op(r, 0x04 | dec | r.code << 3));
        }
        let (p, index) = pair(op, false).ok_or_else(|| bad(op))?;
        Ok(indexed(index, 0x03 | dec << 3 | p << 4))
    }

    fn ex(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        if a.is(TokenKind::De) && b.is(TokenKind::Hl) {
            return Ok(one(0xEB));
        }
        if a.is(TokenKind::Af) && b.is(TokenKind::AfAlt) {
            return Ok(one(0x08));
        }
        if is_ptr(a, TokenKind::Sp) {
            let index = hl_like(b).ok_or_else(|| bad(b))?;
            return Ok(indexed(index, 0xE3));
        }
        Err(bad(a))
    }

    fn im(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let n = need(a)?;
        none(b)?;
        let mode = u8::try_from(n.value)
            .ok()
            .filter(|_| n.is_imm())
            .and_then(|v| tables::find(&IM_MODES, Some(v)))
            .ok_or_else(|| bad(n))?;
        Ok(ed(0x46 | mode << 3))
    }

    fn input(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let a = need(a)?;
        if b.is_invalid() {
            if !is_ptr(a, TokenKind::C) {
                return Err(bad(a));
            }
            self.allow(Undocumented::IO_C, a)?;
            return Ok(ed(0x70));
        }
        if a.is(TokenKind::A) && b.is_addr() {
            let mut code = one(0xDB);
            code.push(byte(b)?);
            return Ok(code);
        }
        if !is_ptr(b, TokenKind::C) {
            return Err(bad(b));
        }
        Ok(ed(0x40 | self.plain_reg(a)? << 3))
    }

    fn output(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        if a.is_addr() && b.is(TokenKind::A) {
            let mut code = one(0xD3);
            code.push(byte(a)?);
            return Ok(code);
        }
        if !is_ptr(a, TokenKind::C) {
            return Err(bad(a));
        }
        if b.is_imm() {
            if b.value != 0 {
                return Err(bad(b));
            }
            self.allow(Undocumented::IO_C, b)?;
            return Ok(ed(0x71));
        }
        Ok(ed(0x41 | self.plain_reg(b)? << 3))
    }

    fn stack(&self, m: Mnemonic, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let op = need(a)?;
        none(b)?;
        let (p, index) = pair(op, true).ok_or_else(|| bad(op))?;
        let base = if m == Mnemonic::Push { 0xC5 } else { 0xC1 };
        Ok(indexed(index, base | p << 4))
    }

    fn ret(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        none(b)?;
        if a.is_invalid() {
            return Ok(one(0xC9));
        }
        let cc = cond(a, 8).ok_or_else(|| bad(a))?;
        Ok(one(0xC0 | cc << 3))
    }

    /// RST to one of the eight zero-page vectors.
    fn rst(&self, a: &Operand, b: &Operand) -> Result<Code, AsmError> {
        let n = need(a)?;
        none(b)?;
        if !n.is_imm() || n.value & !0x38 != 0 {
            return Err(bad(n));
        }
        Ok(one(0xC7 | n.value as u8))
    }
}

impl Encoder for Z80Encoder {
    fn assemble(&self, inst: &Instruction, addr: u16) -> Result<Code, AsmError> {
        let result = self.dispatch(inst, addr);
        match &result {
            Ok(code) => debug!(addr, len = code.len(), "assembled {inst}"),
            Err(err) => warn!(addr, "rejected {}: {err}", inst.mnemonic),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_instruction;
    use pretty_assertions::assert_eq;

    fn asm_at(text: &str, addr: u16) -> Result<Vec<u8>, AsmError> {
        let inst = parse_instruction(text).unwrap();
        Z80Encoder::default().assemble(&inst, addr).map(|c| c.as_slice().to_vec())
    }

    fn asm(text: &str) -> Vec<u8> {
        asm_at(text, 0).unwrap_or_else(|e| panic!("{text}: {e}"))
    }

    #[test]
    fn ld_shapes() {
        assert_eq!(asm("LD A,(BC)"), vec![0x0A]);
        assert_eq!(asm("LD (DE),A"), vec![0x12]);
        assert_eq!(asm("LD A,($1234)"), vec![0x3A, 0x34, 0x12]);
        assert_eq!(asm("LD I,A"), vec![0xED, 0x47]);
        assert_eq!(asm("LD HL,($1234)"), vec![0x2A, 0x34, 0x12]);
        assert_eq!(asm("LD ($1234),IY"), vec![0xFD, 0x22, 0x34, 0x12]);
        assert_eq!(asm("LD SP,IX"), vec![0xDD, 0xF9]);
        assert_eq!(asm("LD BC,($1234)"), vec![0xED, 0x4B, 0x34, 0x12]);
        assert_eq!(asm("LD ($1234),SP"), vec![0xED, 0x73, 0x34, 0x12]);
        assert_eq!(asm("LD DE,$BEEF"), vec![0x11, 0xEF, 0xBE]);
        assert_eq!(asm("LD (IX-2),$7F"), vec![0xDD, 0x36, 0xFE, 0x7F]);
        assert_eq!(asm("LD H,(IY+1)"), vec![0xFD, 0x66, 0x01]);
        assert_eq!(asm("LD IXL,E"), vec![0xDD, 0x6B]);
    }

    #[test]
    fn ld_rejects_illegal_register_mixes() {
        for text in ["LD (HL),(HL)", "LD IXH,H", "LD IXH,(IX+1)", "LD (HL),IXL", "LD (HL+1),A", "LD I,B"] {
            assert!(asm_at(text, 0).is_err(), "{text}");
        }
    }

    #[test]
    fn alu_forms() {
        assert_eq!(asm("ADD A,B"), vec![0x80]);
        assert_eq!(asm("SUB $10"), vec![0xD6, 0x10]);
        assert_eq!(asm("CP (IX+3)"), vec![0xDD, 0xBE, 0x03]);
        assert_eq!(asm("ADD IX,IX"), vec![0xDD, 0x29]);
        assert_eq!(asm("ADC HL,SP"), vec![0xED, 0x7A]);
        assert_eq!(asm("SBC HL,BC"), vec![0xED, 0x42]);
        assert!(asm_at("ADD IX,HL", 0).is_err());
        assert!(asm_at("ADC IX,BC", 0).is_err());
        assert!(asm_at("AND HL,BC", 0).is_err());
    }

    #[test]
    fn cb_forms() {
        assert_eq!(asm("RLC B"), vec![0xCB, 0x00]);
        assert_eq!(asm("SRL (HL)"), vec![0xCB, 0x3E]);
        assert_eq!(asm("BIT 7,A"), vec![0xCB, 0x7F]);
        assert_eq!(asm("SET 0,(IY-1)"), vec![0xFD, 0xCB, 0xFF, 0xC6]);
        assert_eq!(asm("RL (IX+4),C"), vec![0xDD, 0xCB, 0x04, 0x11]);
        assert!(asm_at("BIT 8,A", 0).is_err());
        assert!(asm_at("RLC IXH", 0).is_err());
    }

    #[test]
    fn strict_config_rejects_undocumented() {
        let enc = Z80Encoder::new(CodecConfig::strict());
        for text in ["SL1 B", "LD A,IXH", "IN (C)", "OUT (C),0", "RR (IX+1),B"] {
            let inst = parse_instruction(text).unwrap();
            assert!(enc.assemble(&inst, 0).is_err(), "{text}");
        }
    }

    #[test]
    fn diagnostics_name_the_operand() {
        let err = asm_at("JP (BC)", 0).unwrap_err();
        assert_eq!(err.to_string(), "(BC)?");
        let err = asm_at("LD A", 0).unwrap_err();
        assert_eq!(err.to_string(), "arg?");
        let err = Z80Encoder::default().assemble(&Instruction::default(), 0).unwrap_err();
        assert_eq!(err.to_string(), "op?");
    }
}
