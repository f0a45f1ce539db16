use super::space::{base_digit, KmerSpace};
use ndarray::Array1;

/// Scale factor turning raw counts into counts per kilobase.
const PER_KB: f64 = 1000.0;

/// Count every overlapping k-mer of `seq` into a dense vector over `space`.
///
/// Windows containing a symbol outside the alphabet are skipped. With
/// `normalize`, counts are scaled by `1000 / seq.len()`; the divisor is the
/// full sequence length, not the number of k-mer windows.
/// A sequence shorter than k yields an all-zero vector.
pub fn count_kmers(seq: &[u8], space: &KmerSpace, normalize: bool) -> Array1<f64> {
    let k = space.k();
    let mut counts = Array1::<f64>::zeros(space.len());
    let mask: u64 = (1u64 << (2 * k)) - 1;

    // rolling 2-bit code over the last `valid` alphabet symbols
    let mut code: u64 = 0;
    let mut valid = 0usize;
    for &base in seq {
        match base_digit(base) {
            Some(digit) => {
                code = ((code << 2) | digit) & mask;
                valid += 1;
                if valid >= k {
                    counts[code as usize] += 1.0;
                }
            }
            None => {
                code = 0;
                valid = 0;
            }
        }
    }

    if normalize {
        normalize_per_kb(&mut counts, seq.len());
    }
    counts
}

/// Scale raw counts to counts per kilobase of a sequence of `seq_len` bases.
pub fn normalize_per_kb(counts: &mut Array1<f64>, seq_len: usize) {
    let scale = PER_KB / seq_len as f64;
    counts.mapv_inplace(|c| c * scale);
}
