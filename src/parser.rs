//! Operand and instruction grammar.
//!
//! ```text
//! instruction := mnemonic WS operand (',' operand)*
//! operand     := ['('] core [('+'|'-') number] [')']
//! core        := char-literal | number | bareword
//! ```
//! Numbers take `$` (hex), `&` (octal) or `%` (binary) prefixes, decimal otherwise.

use crate::error::ParseError;
use crate::instructions::{Instruction, Mnemonic, Operand, Token, TokenKind, MAX_OPERANDS};
use crate::tables::Index;

/// Parse an unsigned 16-bit literal with an optional radix prefix.
pub fn parse_unsigned(text: &str) -> Option<u16> {
    let (digits, radix) = match text.as_bytes().first() {
        Some(b'$') => (&text[1..], 16),
        Some(b'&') => (&text[1..], 8),
        Some(b'%') => (&text[1..], 2),
        _ => (text, 10),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u16::from_str_radix(digits, radix).ok()
}

fn is_numeric(text: &str) -> bool {
    matches!(text.as_bytes().first(), Some(b'$' | b'&' | b'%' | b'0'..=b'9'))
}

fn quoted(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    text[1..].strip_suffix(quote)
}

/// Split `(core+disp)` into core text and signed displacement.
fn split_disp(inner: &str) -> Result<(&str, u16), ParseError> {
    if quoted(inner).is_some() {
        return Ok((inner, 0));
    }
    let Some((pos, sign)) = inner.char_indices().skip(1).find(|(_, c)| *c == '+' || *c == '-') else {
        return Ok((inner, 0));
    };
    let text = inner[pos + 1..].trim();
    let magnitude = parse_unsigned(text).ok_or_else(|| ParseError::field("disp", text))?;
    let (limit, value) = if sign == '-' {
        (0x80, magnitude.wrapping_neg())
    } else {
        (0x7F, magnitude)
    };
    if magnitude > limit {
        return Err(ParseError::field("disp", text));
    }
    Ok((inner[..pos].trim_end(), value))
}

/// Parse one comma-delimited operand.
///
/// `index` is the IX/IY family already named by earlier operands of the same
/// instruction; naming the other family is rejected.
pub fn parse_operand(text: &str, index: Option<Index>) -> Result<Operand, ParseError> {
    let text = text.trim();
    let mut token = Token::default();
    let mut core = text;
    let mut disp = 0u16;

    if let Some(rest) = text.strip_prefix('(') {
        let inner = rest.strip_suffix(')').ok_or_else(|| ParseError::operand(text))?;
        token.indirect = true;
        (core, disp) = split_disp(inner.trim())?;
    }

    if let Some(chars) = quoted(core) {
        let mut it = chars.chars();
        let (Some(c), None) = (it.next(), it.next()) else {
            return Err(ParseError::field("char", chars));
        };
        let value = u16::try_from(c as u32).map_err(|_| ParseError::field("char", chars))?;
        token.kind = TokenKind::Immediate;
        return Ok(Operand { token, value: value.wrapping_add(disp) });
    }

    if is_numeric(core) {
        let value = parse_unsigned(core).ok_or_else(|| ParseError::operand(core))?;
        token.kind = TokenKind::Immediate;
        return Ok(Operand { token, value: value.wrapping_add(disp) });
    }

    let kind = TokenKind::from_name(core).ok_or_else(|| ParseError::operand(core))?;
    if matches!((index, kind.index()), (Some(a), Some(b)) if a != b) {
        return Err(ParseError::operand(core));
    }
    token.kind = kind;
    Ok(Operand { token, value: disp })
}

pub fn parse_mnemonic(word: &str) -> Result<Mnemonic, ParseError> {
    Mnemonic::from_name(word).ok_or_else(|| ParseError::field("op", word))
}

/// Split operand text on commas that are not inside a char literal.
pub fn split_operands(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') if matches!(text[start..i].trim(), "" | "(") => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            (None, ',') => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

/// Parse `MNEMONIC op1,op2` into an instruction.
///
/// At most two operands are accepted; a third is reported as an error.
pub fn parse_instruction(text: &str) -> Result<Instruction, ParseError> {
    let text = text.trim();
    let (word, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let mut inst = Instruction::new(parse_mnemonic(word)?);

    let parts = split_operands(rest);
    if let Some(extra) = parts.get(MAX_OPERANDS) {
        return Err(ParseError::operand(extra));
    }
    let mut index = None;
    for (slot, part) in inst.operands.iter_mut().zip(parts) {
        let op = parse_operand(part, index)?;
        index = index.or(op.kind().index());
        *slot = op;
    }
    Ok(inst)
}
