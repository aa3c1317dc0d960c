use anyhow::{anyhow, bail, Result};
use std::path::Path;

use z80mon::memory::{Bus, ADDRESS_SPACE};

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub base: u16,
    pub bytes: Vec<u8>,
    pub perms: &'static str, // e.g., "r-x"
    pub kind: &'static str,  // e.g., "raw"
}

impl Segment {
    /// One past the last mapped address; may be $10000.
    pub fn end(&self) -> u32 {
        self.base as u32 + self.bytes.len() as u32
    }

    fn contains(&self, addr: u16) -> bool {
        (self.base as u32..self.end()).contains(&(addr as u32))
    }
}

#[derive(Debug, Clone)]
pub struct Image {
    pub segments: Vec<Segment>,
}

pub fn load_raw_bin(path: &Path, base: u16, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(
        base as usize + payload.len() <= ADDRESS_SPACE,
        "image at ${base:04X} runs past $FFFF ({} bytes)",
        payload.len()
    );
    let seg = Segment { name: "segment0".into(), base, bytes: payload.to_vec(), perms: "r-x", kind: "raw" };
    Ok(Image { segments: vec![seg] })
}

pub fn read_u8(img: &Image, addr: u16) -> Option<u8> {
    img.segments
        .iter()
        .find(|s| s.contains(addr))
        .map(|s| s.bytes[(addr - s.base) as usize])
}

/// Read-only view of the image for the decoder.
impl Bus for Image {
    fn read_u8(&mut self, addr: u16) -> Result<u8> {
        read_u8(self, addr).ok_or_else(|| anyhow!("${addr:04X} is not mapped"))
    }

    fn write_u8(&mut self, addr: u16, _val: u8) -> Result<()> {
        bail!("image is read-only (write to ${addr:04X})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_maps_skip_and_len() {
        let path = std::env::temp_dir().join("_z80_disasm_model.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 0x8000, 2, Some(3)).unwrap();
        assert_eq!(img.segments.len(), 1);
        let s = &img.segments[0];
        assert_eq!(s.base, 0x8000);
        assert_eq!(s.bytes, vec![2, 3, 4]);
        assert_eq!(read_u8(&img, 0x8002), Some(4));
        assert!(read_u8(&img, 0x8003).is_none());
        assert!(read_u8(&img, 0x7FFF).is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loader_rejects_images_past_top_of_memory() {
        let path = std::env::temp_dir().join("_z80_disasm_model_top.bin");
        std::fs::write(&path, [0u8; 4]).unwrap();
        assert!(load_raw_bin(&path, 0xFFFC, 0, None).is_ok());
        assert!(load_raw_bin(&path, 0xFFFD, 0, None).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn bus_view_is_read_only() {
        let mut img = Image {
            segments: vec![Segment { name: "s".into(), base: 0x10, bytes: vec![0xAA], perms: "r-x", kind: "raw" }],
        };
        assert_eq!(Bus::read_u8(&mut img, 0x10).unwrap(), 0xAA);
        assert!(Bus::read_u8(&mut img, 0x11).is_err());
        assert!(img.write_u8(0x10, 0).is_err());
    }
}
