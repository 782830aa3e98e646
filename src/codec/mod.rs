// Wire-format decoders shared by the coercer
pub mod binary;
pub mod text;

pub use binary::{ArrayDimension, BinaryArray, BinaryDecoder, BinaryField};
pub use text::TextDecoder;
