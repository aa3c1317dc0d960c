//! Immutable encoding tables.
//!
//! Opcodes in this family split into octal groups `xx yyy zzz`; the 3-bit and
//! 2-bit fields index the tables below. Reverse lookups return `None` when a
//! token does not belong to the table's category.

use crate::instructions::{Mnemonic, TokenKind};

pub const PREFIX_IX: u8 = 0xDD;
pub const PREFIX_IY: u8 = 0xFD;
pub const PREFIX_ED: u8 = 0xED;
pub const PREFIX_CB: u8 = 0xCB;

/// Register field value selecting `(HL)` (or `(IX+d)` / `(IY+d)` under a prefix).
pub const REG_M: u8 = 6;

/// Index register selected by a DD/FD prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Index {
    Ix,
    Iy,
}

impl Index {
    pub fn prefix(self) -> u8 {
        match self {
            Index::Ix => PREFIX_IX,
            Index::Iy => PREFIX_IY,
        }
    }

    pub fn from_prefix(code: u8) -> Option<Index> {
        match code {
            PREFIX_IX => Some(Index::Ix),
            PREFIX_IY => Some(Index::Iy),
            _ => None,
        }
    }

    /// The 16-bit register that replaces HL.
    pub fn pair(self) -> TokenKind {
        match self {
            Index::Ix => TokenKind::Ix,
            Index::Iy => TokenKind::Iy,
        }
    }
}

use TokenKind as T;

// Slot 6 is the memory operand; it only matches an indirect HL/IX/IY.
pub const REGS: [TokenKind; 8] = [T::B, T::C, T::D, T::E, T::H, T::L, T::Hl, T::A];
pub const REGS_IX: [TokenKind; 8] = [T::B, T::C, T::D, T::E, T::Ixh, T::Ixl, T::Ix, T::A];
pub const REGS_IY: [TokenKind; 8] = [T::B, T::C, T::D, T::E, T::Iyh, T::Iyl, T::Iy, T::A];

pub const PAIRS: [TokenKind; 4] = [T::Bc, T::De, T::Hl, T::Sp];
pub const PAIRS_IX: [TokenKind; 4] = [T::Bc, T::De, T::Ix, T::Sp];
pub const PAIRS_IY: [TokenKind; 4] = [T::Bc, T::De, T::Iy, T::Sp];

/// PUSH/POP put AF in SP's slot.
pub const PAIRS_AF: [TokenKind; 4] = [T::Bc, T::De, T::Hl, T::Af];
pub const PAIRS_AF_IX: [TokenKind; 4] = [T::Bc, T::De, T::Ix, T::Af];
pub const PAIRS_AF_IY: [TokenKind; 4] = [T::Bc, T::De, T::Iy, T::Af];

/// Branch conditions; JR only takes the first four.
pub const CONDS: [TokenKind; 8] = [T::Nz, T::Z, T::Nc, T::C, T::Po, T::Pe, T::P, T::M];

/// IM operand by the two mode bits of `ED 01 xx1 10`.
pub const IM_MODES: [Option<u8>; 4] = [Some(0), None, Some(1), Some(2)];

use Mnemonic as M;

pub const ALU_OPS: [Mnemonic; 8] = [M::Add, M::Adc, M::Sub, M::Sbc, M::And, M::Xor, M::Or, M::Cp];
pub const ROT_OPS: [Mnemonic; 8] = [M::Rlc, M::Rrc, M::Rl, M::Rr, M::Sla, M::Sra, M::Sl1, M::Srl];
/// Top two bits of a CB opcode; slot 0 is the rotate/shift group.
pub const CB_OPS: [Mnemonic; 4] = [M::Invalid, M::Bit, M::Res, M::Set];
pub const MISC_OPS: [Mnemonic; 8] = [M::Rlca, M::Rrca, M::Rla, M::Rra, M::Daa, M::Cpl, M::Scf, M::Ccf];

/// Block transfer group `ED 10 1rd 0oo`, indexed by `[rd][oo]`.
pub const BLOCK_OPS: [[Mnemonic; 4]; 4] = [
    [M::Ldi, M::Cpi, M::Ini, M::Outi],
    [M::Ldd, M::Cpd, M::Ind, M::Outd],
    [M::Ldir, M::Cpir, M::Inir, M::Otir],
    [M::Lddr, M::Cpdr, M::Indr, M::Otdr],
];

/// Operand-less instructions: mnemonic, whether ED-prefixed, opcode.
pub const FIXED_OPS: &[(Mnemonic, bool, u8)] = &[
    (M::Nop, false, 0x00),
    (M::Rlca, false, 0x07),
    (M::Rrca, false, 0x0F),
    (M::Rla, false, 0x17),
    (M::Rra, false, 0x1F),
    (M::Daa, false, 0x27),
    (M::Cpl, false, 0x2F),
    (M::Scf, false, 0x37),
    (M::Ccf, false, 0x3F),
    (M::Halt, false, 0x76),
    (M::Exx, false, 0xD9),
    (M::Di, false, 0xF3),
    (M::Ei, false, 0xFB),
    (M::Neg, true, 0x44),
    (M::Retn, true, 0x45),
    (M::Reti, true, 0x4D),
    (M::Rrd, true, 0x67),
    (M::Rld, true, 0x6F),
    (M::Ldi, true, 0xA0),
    (M::Cpi, true, 0xA1),
    (M::Ini, true, 0xA2),
    (M::Outi, true, 0xA3),
    (M::Ldd, true, 0xA8),
    (M::Cpd, true, 0xA9),
    (M::Ind, true, 0xAA),
    (M::Outd, true, 0xAB),
    (M::Ldir, true, 0xB0),
    (M::Cpir, true, 0xB1),
    (M::Inir, true, 0xB2),
    (M::Otir, true, 0xB3),
    (M::Lddr, true, 0xB8),
    (M::Cpdr, true, 0xB9),
    (M::Indr, true, 0xBA),
    (M::Otdr, true, 0xBB),
];

pub const MNEMONIC_NAMES: &[(Mnemonic, &str)] = &[
    (M::Adc, "ADC"),
    (M::Add, "ADD"),
    (M::And, "AND"),
    (M::Bit, "BIT"),
    (M::Call, "CALL"),
    (M::Ccf, "CCF"),
    (M::Cp, "CP"),
    (M::Cpd, "CPD"),
    (M::Cpdr, "CPDR"),
    (M::Cpi, "CPI"),
    (M::Cpir, "CPIR"),
    (M::Cpl, "CPL"),
    (M::Daa, "DAA"),
    (M::Dec, "DEC"),
    (M::Di, "DI"),
    (M::Djnz, "DJNZ"),
    (M::Ei, "EI"),
    (M::Ex, "EX"),
    (M::Exx, "EXX"),
    (M::Halt, "HALT"),
    (M::Im, "IM"),
    (M::In, "IN"),
    (M::Inc, "INC"),
    (M::Ind, "IND"),
    (M::Indr, "INDR"),
    (M::Ini, "INI"),
    (M::Inir, "INIR"),
    (M::Jp, "JP"),
    (M::Jr, "JR"),
    (M::Ld, "LD"),
    (M::Ldd, "LDD"),
    (M::Lddr, "LDDR"),
    (M::Ldi, "LDI"),
    (M::Ldir, "LDIR"),
    (M::Neg, "NEG"),
    (M::Nop, "NOP"),
    (M::Or, "OR"),
    (M::Otdr, "OTDR"),
    (M::Otir, "OTIR"),
    (M::Out, "OUT"),
    (M::Outd, "OUTD"),
    (M::Outi, "OUTI"),
    (M::Pop, "POP"),
    (M::Push, "PUSH"),
    (M::Res, "RES"),
    (M::Ret, "RET"),
    (M::Reti, "RETI"),
    (M::Retn, "RETN"),
    (M::Rl, "RL"),
    (M::Rla, "RLA"),
    (M::Rlc, "RLC"),
    (M::Rlca, "RLCA"),
    (M::Rld, "RLD"),
    (M::Rr, "RR"),
    (M::Rra, "RRA"),
    (M::Rrc, "RRC"),
    (M::Rrca, "RRCA"),
    (M::Rrd, "RRD"),
    (M::Rst, "RST"),
    (M::Sbc, "SBC"),
    (M::Scf, "SCF"),
    (M::Set, "SET"),
    (M::Sl1, "SL1"),
    (M::Sla, "SLA"),
    (M::Sra, "SRA"),
    (M::Srl, "SRL"),
    (M::Sub, "SUB"),
    (M::Xor, "XOR"),
];

pub const TOKEN_NAMES: &[(TokenKind, &str)] = &[
    (T::A, "A"),
    (T::Af, "AF"),
    (T::AfAlt, "AF'"),
    (T::B, "B"),
    (T::Bc, "BC"),
    (T::C, "C"),
    (T::D, "D"),
    (T::De, "DE"),
    (T::E, "E"),
    (T::H, "H"),
    (T::Hl, "HL"),
    (T::I, "I"),
    (T::Ix, "IX"),
    (T::Ixh, "IXH"),
    (T::Ixl, "IXL"),
    (T::Iy, "IY"),
    (T::Iyh, "IYH"),
    (T::Iyl, "IYL"),
    (T::L, "L"),
    (T::M, "M"),
    (T::Nc, "NC"),
    (T::Nz, "NZ"),
    (T::P, "P"),
    (T::Pe, "PE"),
    (T::Po, "PO"),
    (T::R, "R"),
    (T::Sp, "SP"),
    (T::Z, "Z"),
];

/// Position of `item` in `table` as an encoding field value.
pub fn find<V: PartialEq + Copy>(table: &[V], item: V) -> Option<u8> {
    table.iter().position(|&v| v == item).map(|i| i as u8)
}

pub fn reg_table(index: Option<Index>) -> &'static [TokenKind; 8] {
    match index {
        None => &REGS,
        Some(Index::Ix) => &REGS_IX,
        Some(Index::Iy) => &REGS_IY,
    }
}

pub fn pair_table(index: Option<Index>, use_af: bool) -> &'static [TokenKind; 4] {
    match (index, use_af) {
        (None, false) => &PAIRS,
        (Some(Index::Ix), false) => &PAIRS_IX,
        (Some(Index::Iy), false) => &PAIRS_IY,
        (None, true) => &PAIRS_AF,
        (Some(Index::Ix), true) => &PAIRS_AF_IX,
        (Some(Index::Iy), true) => &PAIRS_AF_IY,
    }
}
