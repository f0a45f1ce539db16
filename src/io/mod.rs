pub mod report;
pub mod sequence;

pub use sequence::{SequenceReader, SequenceRecord};
