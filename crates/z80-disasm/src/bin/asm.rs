use anyhow::{anyhow, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use z80mon::encoder::Encoder;
use z80mon::parser::{parse_instruction, parse_unsigned};
use z80mon::{CodecConfig, Z80Encoder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Z80 line assembler (one instruction per line)")]
struct Opts {
    /// Input assembly file
    #[arg(short, long)]
    input: PathBuf,
    /// Output binary file
    #[arg(short, long)]
    output: PathBuf,
    /// Address of the first byte (used for relative branch targets)
    #[arg(long, default_value = "0", value_parser = parse_addr)]
    start: u16,
    /// Documented opcodes only
    #[arg(long)]
    strict: bool,
}

fn parse_addr(s: &str) -> Result<u16, String> {
    parse_unsigned(s.trim()).ok_or_else(|| format!("bad address: {s}"))
}

/// Strip a `;` comment unless the semicolon is a char literal.
/// A quote right after a letter is the `'` of `AF'`, not a literal.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut prev = ' ';
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '\'' | '"') if !prev.is_ascii_alphanumeric() => quote = Some(c),
            (Some(q), _) if q == c => quote = None,
            (None, ';') => return &line[..i],
            _ => {}
        }
        prev = c;
    }
    line
}

/// Assemble `text` starting at `start`.
fn assemble(text: &str, start: u16, enc: &Z80Encoder) -> Result<Vec<u8>> {
    let mut bin = Vec::new();
    let mut pc = start;
    for (i, line) in text.lines().enumerate() {
        let s = strip_comment(line).trim();
        if s.is_empty() {
            continue;
        }
        let inst = parse_instruction(s).map_err(|e| anyhow!("line {}: {e}", i + 1))?;
        let code = enc.assemble(&inst, pc).map_err(|e| anyhow!("line {}: {e}", i + 1))?;
        bin.extend_from_slice(code.as_slice());
        pc = pc.wrapping_add(code.len() as u16);
    }
    Ok(bin)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let cfg = if opts.strict { CodecConfig::strict() } else { CodecConfig::default() };
    let text = fs::read_to_string(&opts.input)?;
    let bin = assemble(&text, opts.start, &Z80Encoder::new(cfg))?;
    fs::write(&opts.output, &bin)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assembles_lines_with_comments() {
        let text = "; header\n  LD A,';' ; load\n\nloop_:\n";
        let err = assemble(text, 0, &Z80Encoder::default()).unwrap_err();
        assert_eq!(err.to_string(), "line 4: op: loop_:?");

        let text = "LD A,';'\nDJNZ $8000 ; back to start\nRET\n";
        let bin = assemble(text, 0x8000, &Z80Encoder::default()).unwrap();
        assert_eq!(bin, vec![0x3E, 0x3B, 0x10, 0xFC, 0xC9]);

        let bin = assemble("EX AF,AF' ; swap\n", 0, &Z80Encoder::default()).unwrap();
        assert_eq!(bin, vec![0x08]);
    }
}
