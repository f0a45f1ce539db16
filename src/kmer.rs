//! K-mer vocabulary and counting.
//!
//! Every profile in this crate is a dense `Array1<f64>` of length 4^k whose
//! entries line up with [`KmerSpace`] order.

mod count;
mod space;

pub use count::count_kmers;
pub use space::{space_size, KmerSpace};
