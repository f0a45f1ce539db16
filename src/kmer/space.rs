use crate::error::{Result, SeekrError};
use tracing::warn;

/// Nucleotide alphabet in enumeration order.
///
/// The order is load-bearing: every profile vector is indexed by the
/// position of a k-mer in the Cartesian product of this alphabet.
pub const BASES: [u8; 4] = *b"ATCG";

/// Largest k whose 2-bit code fits in a `u64`.
const MAX_K: usize = 31;

/// Beyond this, 4^k sized profiles get expensive quickly.
const LARGE_K_WARNING: usize = 12;

/// ASCII -> digit in `BASES` order (A=0, T=1, C=2, G=3), 0xFF otherwise.
static DIGIT_LUT: [u8; 256] = {
    const X: u8 = 0xFF;
    let mut t = [X; 256];
    t[b'A' as usize] = 0;
    t[b'a' as usize] = 0;
    t[b'T' as usize] = 1;
    t[b't' as usize] = 1;
    t[b'C' as usize] = 2;
    t[b'c' as usize] = 2;
    t[b'G' as usize] = 3;
    t[b'g' as usize] = 3;
    t
};

/// Digit of a base within `BASES`, `None` for anything outside the alphabet.
#[inline]
pub fn base_digit(base: u8) -> Option<u64> {
    let v = DIGIT_LUT[base as usize];
    if v <= 3 {
        Some(v as u64)
    } else {
        None
    }
}

/// The ordered vocabulary of all 4^k k-mers.
///
/// Entries follow a repeated Cartesian product of [`BASES`] with the
/// rightmost position varying fastest (`AA, AT, AC, AG, TA, ...` for k=2),
/// so the index of a k-mer is its base-4 value with digits taken from
/// [`BASES`]. Build once per k and share; it is immutable.
#[derive(Debug, Clone)]
pub struct KmerSpace {
    k: usize,
    kmers: Vec<String>,
}

impl KmerSpace {
    pub fn build(k: usize) -> Result<Self> {
        let size = space_size(k)?;
        if k > LARGE_K_WARNING {
            warn!("k={k} allocates 4^{k} = {size} entries per profile");
        }

        let mut kmers = Vec::with_capacity(size);
        let mut buf = Vec::with_capacity(k);
        product(&mut kmers, &mut buf, k);

        Ok(Self { k, kmers })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of entries, 4^k.
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn kmers(&self) -> &[String] {
        &self.kmers
    }

    pub fn kmer(&self, index: usize) -> Option<&str> {
        self.kmers.get(index).map(String::as_str)
    }

    /// Index of `kmer` in the enumeration, or `None` if it has the wrong
    /// length or contains a symbol outside the alphabet.
    pub fn index_of(&self, kmer: &[u8]) -> Option<usize> {
        if kmer.len() != self.k {
            return None;
        }
        let mut code: u64 = 0;
        for &b in kmer {
            code = (code << 2) | base_digit(b)?;
        }
        Some(code as usize)
    }
}

/// Number of k-mers for `k`, checking that k is usable.
pub fn space_size(k: usize) -> Result<usize> {
    if k == 0 {
        return Err(SeekrError::InvalidK { k });
    }
    match 4_usize.checked_pow(k as u32) {
        Some(size) if k <= MAX_K => Ok(size),
        _ => Err(SeekrError::KTooLarge { k }),
    }
}

fn product(out: &mut Vec<String>, buf: &mut Vec<u8>, k_left: usize) {
    if k_left == 0 {
        // buf only ever holds bytes from BASES
        out.push(String::from_utf8_lossy(buf).into_owned());
        return;
    }
    for &base in &BASES {
        buf.push(base);
        product(out, buf, k_left - 1);
        buf.pop();
    }
}
