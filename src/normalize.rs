//! Standardizing k-mer profiles against a reference population.

use crate::error::{Result, SeekrError};
use crate::kmer::{count_kmers, KmerSpace};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use tracing::{debug, warn};

/// Per k-mer mean and population standard deviation of a reference set of
/// counts-per-kb profiles. Read-only once fit.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceStats {
    k: usize,
    mean: Array1<f64>,
    sd: Array1<f64>,
}

impl ReferenceStats {
    /// Fit from a reference matrix, one profile per row.
    ///
    /// A single-row reference gives sd = 0 everywhere; that is kept, and every
    /// later standardization against it is non-finite.
    pub fn fit(space: &KmerSpace, reference: &Array2<f64>) -> Result<Self> {
        if reference.nrows() == 0 {
            return Err(SeekrError::EmptyReference);
        }
        check_len(space.len(), reference.ncols())?;

        let mean = reference
            .mean_axis(Axis(0))
            .ok_or(SeekrError::EmptyReference)?;
        let sd = reference.std_axis(Axis(0), 0.0);

        let zero_sd = sd.iter().filter(|&&s| s == 0.0).count();
        if zero_sd > 0 {
            warn!(
                "{zero_sd} of {} {}-mers have zero standard deviation in a reference of {} sequences; their standardized values will be non-finite",
                space.len(),
                space.k(),
                reference.nrows()
            );
        }
        debug!("Fit {}-mer reference statistics over {} sequences", space.k(), reference.nrows());

        Ok(Self { k: space.k(), mean, sd })
    }

    /// Count each reference sequence (counts per kb) and fit on the result.
    pub fn from_sequences<S: AsRef<[u8]>>(space: &KmerSpace, seqs: &[S]) -> Result<Self> {
        let counts = count_matrix(space, seqs);
        Self::fit(space, &counts)
    }

    /// Assemble statistics from previously computed columns.
    pub fn from_parts(space: &KmerSpace, mean: Array1<f64>, sd: Array1<f64>) -> Result<Self> {
        check_len(space.len(), mean.len())?;
        check_len(space.len(), sd.len())?;
        Ok(Self { k: space.k(), mean, sd })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn sd(&self) -> &Array1<f64> {
        &self.sd
    }

    /// `(profile - mean) / sd`, elementwise. Division by zero is not masked.
    pub fn standardize(&self, profile: ArrayView1<f64>) -> Result<Array1<f64>> {
        check_len(self.mean.len(), profile.len())?;
        Ok((&profile - &self.mean) / &self.sd)
    }

    /// Standardized counts-per-kb profile of a single sequence.
    pub fn target_norm_one(&self, space: &KmerSpace, seq: &[u8]) -> Result<Array1<f64>> {
        self.check_space(space)?;
        let counts = count_kmers(&seq.to_ascii_uppercase(), space, true);
        self.standardize(counts.view())
    }

    /// Standardized profiles of many sequences (tiles), one row each, in
    /// input order.
    pub fn target_norm<S: AsRef<[u8]>>(&self, space: &KmerSpace, seqs: &[S]) -> Result<Array2<f64>> {
        self.check_space(space)?;
        let mut rows = count_matrix(space, seqs);
        for mut row in rows.rows_mut() {
            row -= &self.mean;
            row /= &self.sd;
        }
        Ok(rows)
    }

    fn check_space(&self, space: &KmerSpace) -> Result<()> {
        if space.k() != self.k {
            return Err(SeekrError::ReferenceStatsMismatch {
                k: space.k(),
                reason: format!("statistics were fit for k={}", self.k),
            });
        }
        check_len(self.mean.len(), space.len())
    }
}

/// Counts-per-kb profiles of `seqs`, one row each.
fn count_matrix<S: AsRef<[u8]>>(space: &KmerSpace, seqs: &[S]) -> Array2<f64> {
    let mut out = Array2::<f64>::zeros((seqs.len(), space.len()));
    for (mut row, seq) in out.rows_mut().into_iter().zip(seqs) {
        let upper = seq.as_ref().to_ascii_uppercase();
        row.assign(&count_kmers(&upper, space, true));
    }
    out
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(SeekrError::DimensionMismatch { expected, found });
    }
    Ok(())
}
