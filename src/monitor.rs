//! The `asm` and `dasm` monitor commands.
//!
//! Each command writes its listing or diagnostic into a caller-supplied buffer
//! and returns the address the next command of the same kind should start at.

use std::fmt::Write as _;

use tracing::debug;

use crate::config::CodecConfig;
use crate::decoder::Decoder;
use crate::disasm::fmt_decoded;
use crate::encoder::Encoder;
use crate::error::ParseError;
use crate::isa::z80::{Z80Decoder, Z80Encoder};
use crate::memory::Bus;
use crate::parser::{parse_instruction, parse_unsigned};

pub struct Monitor<B: Bus> {
    pub bus: B,
    pub encoder: Z80Encoder,
    pub decoder: Z80Decoder,
}

/// First whitespace-delimited word and the trimmed remainder.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (text, ""),
    }
}

/// Labeled numeric argument; prints `label: text?` when it does not parse.
fn arg(label: &'static str, text: &str, out: &mut String) -> Option<u16> {
    let value = parse_unsigned(text);
    if value.is_none() {
        let _ = writeln!(out, "{}", ParseError::field(label, text));
    }
    value
}

impl<B: Bus> Monitor<B> {
    pub fn new(bus: B, cfg: CodecConfig) -> Self {
        Self {
            bus,
            encoder: Z80Encoder::new(cfg),
            decoder: Z80Decoder::new(cfg),
        }
    }

    /// `asm <start> <mnemonic> [operands]`
    ///
    /// Writes the code and echoes its disassembly. Returns the address after
    /// the new code, `start` if encoding failed, or `None` if `start` itself
    /// is unusable.
    pub fn cmd_asm(&mut self, args: &str, out: &mut String) -> Option<u16> {
        let (start, text) = split_word(args);
        let start = arg("start", start, out)?;

        let inst = match parse_instruction(text) {
            Ok(inst) => inst,
            Err(err) => {
                let _ = writeln!(out, "{err}");
                return Some(start);
            }
        };
        match self.encoder.encode(&mut self.bus, &inst, start) {
            Ok(len) => {
                debug!(start, len, "asm");
                self.disassemble(start, 1, out);
                Some(start.wrapping_add(len as u16))
            }
            Err(err) => {
                let _ = writeln!(out, "{err}");
                Some(start)
            }
        }
    }

    /// `dasm <start> [size]`, size defaulting to one byte.
    pub fn cmd_dasm(&mut self, args: &str, out: &mut String) -> Option<u16> {
        let mut words = args.split_whitespace();
        let start = arg("start", words.next().unwrap_or(""), out)?;
        let size = match words.next() {
            Some(text) => arg("size", text, out)?,
            None => 1,
        };
        Some(self.disassemble(start, size, out))
    }

    /// List every instruction that starts inside `[start, start+size)`.
    ///
    /// An instruction that straddles the end is still listed in full. Undefined
    /// opcodes are reported in place and the sweep continues after them.
    pub fn disassemble(&mut self, start: u16, size: u16, out: &mut String) -> u16 {
        let end = start.wrapping_add(size).wrapping_sub(1);
        let mut addr = start;
        loop {
            let next = match self.decoder.decode(&mut self.bus, addr) {
                Ok(d) => {
                    let _ = writeln!(out, "{}", fmt_decoded(addr, &d));
                    d.next
                }
                Err(err) => {
                    let _ = writeln!(out, "{addr:04X}:  {err}");
                    match err.resume() {
                        Some(next) => next,
                        None => return addr,
                    }
                }
            };
            // Distances from `addr` keep the test correct across $FFFF
            if end.wrapping_sub(addr) < next.wrapping_sub(addr) {
                return next;
            }
            addr = next;
        }
    }

    /// Run one command line. Returns the suggested next command, e.g. `asm $8003 `.
    pub fn execute(&mut self, line: &str, out: &mut String) -> Option<String> {
        let (cmd, args) = split_word(line);
        let next = match cmd.to_ascii_lowercase().as_str() {
            "asm" => self.cmd_asm(args, out),
            "dasm" => self.cmd_dasm(args, out),
            _ => {
                let _ = writeln!(out, "{}", ParseError::field("cmd", cmd));
                None
            }
        }?;
        Some(format!("{cmd} ${next:04X} "))
    }

    /// Complete a typed line against the pre-filled `prompt`.
    ///
    /// A line that starts with a command word stands alone; anything else is
    /// the rest of the prompt, so `NOP` after `asm $8002 ` runs `asm $8002 NOP`.
    pub fn continue_line(prompt: &str, line: &str) -> String {
        let (word, _) = split_word(line);
        let known = ["asm", "dasm"]
            .iter()
            .any(|cmd| word.eq_ignore_ascii_case(cmd));
        if known || prompt.trim().is_empty() {
            line.to_string()
        } else {
            format!("{prompt}{line}")
        }
    }
}
