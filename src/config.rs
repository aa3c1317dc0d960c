use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undocumented: u8 {
const INDEX_HALVES = 1 << 0; // IXH, IXL, IYH, IYL
const SL1 = 1 << 1; // CB 30..37
const INDEX_CB_COPY = 1 << 2; // rot (IX+d),r
const IO_C = 1 << 3; // IN (C) and OUT (C),0
}
}

/// Which undocumented opcodes the encoder accepts and the decoder recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecConfig {
    pub undocumented: Undocumented,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            undocumented: Undocumented::all(),
        }
    }
}

impl CodecConfig {
    /// Documented opcodes only.
    pub fn strict() -> Self {
        Self {
            undocumented: Undocumented::empty(),
        }
    }

    pub fn allows(&self, flag: Undocumented) -> bool {
        self.undocumented.contains(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_allows_everything() {
        let cfg = CodecConfig::default();
        assert!(cfg.allows(Undocumented::SL1 | Undocumented::IO_C));
        assert!(!CodecConfig::strict().allows(Undocumented::INDEX_HALVES));
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = CodecConfig {
            undocumented: Undocumented::INDEX_HALVES | Undocumented::IO_C,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CodecConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
