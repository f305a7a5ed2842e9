// Core primitives for CSV tokenization

pub mod encoding;
pub mod field;
pub mod newlines;
pub mod scanner;
pub mod simd;

pub use encoding::{Decoder, Encoding};
pub use field::*;
pub use newlines::{LineBreak, Scan, Terminators};
pub use scanner::*;
pub use simd::{avx2_available, sse2_available, CHUNK, WIDE, WORD};
