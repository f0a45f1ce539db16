use crate::error::{Result, SeekrError};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};

/// Pearson r between `query` and every row of `targets`, in row order.
///
/// Positions where either operand is NaN are left out of that row's
/// coefficient, so a k-mer absent from the reference (0/0 after
/// standardization) does not poison every score. Infinities are kept and
/// turn the row's r into NaN. Fewer than two usable pairs, or zero
/// variance over the usable pairs, also give NaN.
///
/// All rows are computed at once over a (rows x k-mers) pairing mask.
pub fn kmer_pearson(query: ArrayView1<f64>, targets: ArrayView2<f64>) -> Result<Array1<f64>> {
    if targets.ncols() != query.len() {
        return Err(SeekrError::DimensionMismatch {
            expected: query.len(),
            found: targets.ncols(),
        });
    }

    let paired: Array2<bool> = Zip::from(&targets)
        .and_broadcast(&query)
        .map_collect(|&t, &q| !(t.is_nan() || q.is_nan()));
    let n = paired.mapv(|p| if p { 1.0 } else { 0.0 }).sum_axis(Axis(1));

    let q_kept = Zip::from(&paired)
        .and_broadcast(&query)
        .map_collect(|&p, &q| if p { q } else { 0.0 });
    let t_kept = Zip::from(&paired)
        .and(&targets)
        .map_collect(|&p, &t| if p { t } else { 0.0 });

    let q_centered = centre_rows(&paired, &q_kept, &n);
    let t_centered = centre_rows(&paired, &t_kept, &n);

    let cov = (&q_centered * &t_centered).sum_axis(Axis(1));
    let q_ss = (&q_centered * &q_centered).sum_axis(Axis(1));
    let t_ss = (&t_centered * &t_centered).sum_axis(Axis(1));
    Ok(cov / (q_ss * t_ss).mapv(f64::sqrt))
}

/// Subtract each row's mean over its paired cells; unpaired cells stay 0.
fn centre_rows(paired: &Array2<bool>, kept: &Array2<f64>, n: &Array1<f64>) -> Array2<f64> {
    let mean = kept.sum_axis(Axis(1)) / n;
    Zip::from(paired)
        .and(kept)
        .and_broadcast(&mean.insert_axis(Axis(1)))
        .map_collect(|&p, &v, &m| if p { v - m } else { 0.0 })
}
