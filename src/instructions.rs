use crate::tables::{Index, MNEMONIC_NAMES, TOKEN_NAMES};

/// Instruction keywords understood by the assembler and produced by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mnemonic {
    Adc,
    Add,
    And,
    Bit,
    Call,
    Ccf,
    Cp,
    Cpd,
    Cpdr,
    Cpi,
    Cpir,
    Cpl,
    Daa,
    Dec,
    Di,
    Djnz,
    Ei,
    Ex,
    Exx,
    Halt,
    Im,
    In,
    Inc,
    Ind,
    Indr,
    Ini,
    Inir,
    Jp,
    Jr,
    Ld,
    Ldd,
    Lddr,
    Ldi,
    Ldir,
    Neg,
    Nop,
    Or,
    Otdr,
    Otir,
    Out,
    Outd,
    Outi,
    Pop,
    Push,
    Res,
    Ret,
    Reti,
    Retn,
    Rl,
    Rla,
    Rlc,
    Rlca,
    Rld,
    Rr,
    Rra,
    Rrc,
    Rrca,
    Rrd,
    Rst,
    Sbc,
    Scf,
    Set,
    Sl1,
    Sla,
    Sra,
    Srl,
    Sub,
    Xor,
    #[default]
    Invalid,
}

impl Mnemonic {
    pub fn name(self) -> &'static str {
        MNEMONIC_NAMES
            .iter()
            .find(|(m, _)| *m == self)
            .map(|(_, name)| *name)
            .unwrap_or("?")
    }

    /// Case-insensitive lookup of a mnemonic keyword.
    pub fn from_name(text: &str) -> Option<Mnemonic> {
        MNEMONIC_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(text))
            .map(|(m, _)| *m)
    }
}

/// Operand classes: registers, pairs, conditions and the immediate/sentinel cases.
///
/// `C` doubles as the carry condition and `M` is the sign condition; `(HL)`
/// is `Hl` with the indirect flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    A,
    Af,
    AfAlt,
    B,
    Bc,
    C,
    D,
    De,
    E,
    H,
    Hl,
    I,
    Ix,
    Ixh,
    Ixl,
    Iy,
    Iyh,
    Iyl,
    L,
    M,
    Nc,
    Nz,
    P,
    Pe,
    Po,
    R,
    Sp,
    Z,
    #[default]
    Invalid,
    Immediate,
    /// The interrupt mode with no documented meaning (`IM ?`).
    Undefined,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Invalid | TokenKind::Undefined => "?",
            kind => TOKEN_NAMES
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|(_, name)| *name)
                .unwrap_or("?"),
        }
    }

    /// Case-insensitive lookup of a register, pair or condition name.
    pub fn from_name(text: &str) -> Option<TokenKind> {
        TOKEN_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(text))
            .map(|(k, _)| *k)
    }

    /// Index register family this token belongs to, if any.
    pub fn index(self) -> Option<Index> {
        match self {
            TokenKind::Ix | TokenKind::Ixh | TokenKind::Ixl => Some(Index::Ix),
            TokenKind::Iy | TokenKind::Iyh | TokenKind::Iyl => Some(Index::Iy),
            _ => None,
        }
    }
}

/// Rendering hint for immediates, attached by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Word,
    Byte,
    Digit,
}

/// A token plus the indirect flag and a print hint.
///
/// Equality ignores `format`: two tokens naming the same operand compare equal
/// however they were parsed or decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Token {
    pub kind: TokenKind,
    pub indirect: bool,
    pub format: Format,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.indirect == other.indirect
    }
}

impl Eq for Token {}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self { kind, indirect: false, format: Format::Word }
    }

    pub fn indirect(kind: TokenKind) -> Self {
        Self { kind, indirect: true, format: Format::Word }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operand {
    pub token: Token,
    /// Immediate, absolute address, or sign-extended displacement.
    pub value: u16,
}

impl Operand {
    pub fn reg(kind: TokenKind) -> Self {
        Self { token: Token::new(kind), value: 0 }
    }

    pub fn ind(kind: TokenKind) -> Self {
        Self { token: Token::indirect(kind), value: 0 }
    }

    /// `(IX+d)` / `(IY+d)`.
    pub fn index(index: Index, disp: i8) -> Self {
        Self { token: Token::indirect(index.pair()), value: disp as i16 as u16 }
    }

    pub fn imm(value: u16) -> Self {
        Self { token: Token::new(TokenKind::Immediate), value }
    }

    pub fn byte(value: u8) -> Self {
        let mut op = Self::imm(value as u16);
        op.token.format = Format::Byte;
        op
    }

    pub fn word(value: u16) -> Self {
        Self::imm(value)
    }

    pub fn digit(value: u8) -> Self {
        let mut op = Self::imm(value as u16);
        op.token.format = Format::Digit;
        op
    }

    /// `(nn)`: memory at an absolute address.
    pub fn addr(value: u16) -> Self {
        Self { token: Token::indirect(TokenKind::Immediate), value }
    }

    /// `(n)`: an 8-bit I/O port.
    pub fn port(value: u8) -> Self {
        let mut op = Self::addr(value as u16);
        op.token.format = Format::Byte;
        op
    }

    pub fn with_value(mut self, value: u16) -> Self {
        self.value = value;
        self
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    pub fn is_invalid(&self) -> bool {
        self.token.kind == TokenKind::Invalid
    }

    /// Direct (non-parenthesized) operand of the given kind.
    pub fn is(&self, kind: TokenKind) -> bool {
        !self.token.indirect && self.token.kind == kind
    }

    /// Parenthesized operand of the given kind.
    pub fn is_ind(&self, kind: TokenKind) -> bool {
        self.token.indirect && self.token.kind == kind
    }

    pub fn is_imm(&self) -> bool {
        self.is(TokenKind::Immediate)
    }

    pub fn is_addr(&self) -> bool {
        self.is_ind(TokenKind::Immediate)
    }

    /// The payload read as a signed byte displacement.
    pub fn disp(&self) -> Option<i8> {
        i8::try_from(self.value as i16).ok()
    }
}

pub const MAX_OPERANDS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub operands: [Operand; MAX_OPERANDS],
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic) -> Self {
        Self { mnemonic, operands: [Operand::default(); MAX_OPERANDS] }
    }

    pub fn unary(mnemonic: Mnemonic, op: Operand) -> Self {
        Self { mnemonic, operands: [op, Operand::default()] }
    }

    pub fn binary(mnemonic: Mnemonic, dst: Operand, src: Operand) -> Self {
        Self { mnemonic, operands: [dst, src] }
    }

    /// Number of leading operands that carry a token.
    pub fn arity(&self) -> usize {
        self.operands.iter().take_while(|op| !op.is_invalid()).count()
    }
}
