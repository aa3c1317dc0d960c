pub mod listing;
pub mod model;

pub use listing::{disassemble_range, Line};
pub use model::{load_raw_bin, read_u8, Image, Segment};
