//! Linear sweep over an image.

use serde::Serialize;

use z80mon::decoder::Decoder;
use z80mon::Z80Decoder;

use crate::model::{read_u8, Image};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

/// Decode every instruction starting in `[start, end)`; `end` may be $10000.
///
/// Undecodable bytes become a line carrying the diagnostic, and the sweep
/// picks up at the decoder's resume address. Running into unmapped memory
/// ends the sweep.
pub fn disassemble_range(img: &mut Image, dec: &Z80Decoder, start: u16, end: u32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut pc = start as u32;
    while pc < end {
        let addr = pc as u16;
        let (next, text) = match dec.decode(img, addr) {
            Ok(d) => (pc + d.width(addr) as u32, d.inst.to_string()),
            Err(err) => match err.resume() {
                Some(resume) => (pc + resume.wrapping_sub(addr) as u32, err.to_string()),
                None => {
                    lines.push(Line { addr, bytes: Vec::new(), text: err.to_string() });
                    break;
                }
            },
        };
        let bytes = (pc..next).filter_map(|a| read_u8(img, a as u16)).collect();
        lines.push(Line { addr, bytes, text });
        pc = next;
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Segment;
    use pretty_assertions::assert_eq;

    fn image(base: u16, bytes: &[u8]) -> Image {
        Image {
            segments: vec![Segment { name: "t".into(), base, bytes: bytes.to_vec(), perms: "r-x", kind: "raw" }],
        }
    }

    #[test]
    fn sweep_lists_bytes_and_text() {
        let mut img = image(0x100, &[0x3E, 0x01, 0xC9]);
        let lines = disassemble_range(&mut img, &Z80Decoder::default(), 0x100, 0x103);
        assert_eq!(
            lines,
            vec![
                Line { addr: 0x100, bytes: vec![0x3E, 0x01], text: "LD A,$01".into() },
                Line { addr: 0x102, bytes: vec![0xC9], text: "RET".into() },
            ]
        );
    }

    #[test]
    fn sweep_resumes_after_undefined_opcode() {
        let mut img = image(0, &[0xED, 0x00, 0x00]);
        let lines = disassemble_range(&mut img, &Z80Decoder::default(), 0, 3);
        assert_eq!(lines[0].text, "$ED00?");
        assert_eq!(lines[0].bytes, vec![0xED, 0x00]);
        assert_eq!(lines[1].text, "NOP");
    }

    #[test]
    fn sweep_stops_at_unmapped_memory() {
        let mut img = image(0, &[0x21, 0x00]);
        let lines = disassemble_range(&mut img, &Z80Decoder::default(), 0, 2);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].bytes.is_empty());
        assert!(lines[0].text.contains("not mapped"));
    }
}
