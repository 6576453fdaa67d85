//! Parsing primitives shared by every container decoder

mod reader;

pub use reader::RecordReader;
