//! Z80 codec: documented opcodes plus the common undocumented ones, gated by
//! [`CodecConfig`](crate::config::CodecConfig).

mod decode;
mod encode;

pub use decode::Z80Decoder;
pub use encode::Z80Encoder;
