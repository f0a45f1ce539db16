//! Calibrating correlation scores against an empirical background.
//!
//! A background is the set of Pearson r values obtained by scoring a
//! reference population against the same query. Two calibrations are
//! offered: [`ThresholdModel`] (mean + k_sigma x sd cut-off, used for batch
//! hit rates) and [`PercentileModel`] (empirical percentile rank, used when
//! scanning a single sequence).

use crate::error::{Result, SeekrError};
use ndarray::{Array1, ArrayView1};
use tracing::warn;

/// Turns a raw correlation into a calibrated per-tile score.
pub trait BackgroundModel {
    fn score(&self, r: f64) -> f64;

    fn score_all(&self, correlations: ArrayView1<f64>) -> Array1<f64> {
        correlations.mapv(|r| self.score(r))
    }
}

/// Hit threshold at `mean(background) + k_sigma * sd(background)`.
///
/// NaN values in the background make the threshold NaN, and no tile can
/// exceed a NaN threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdModel {
    pub mean: f64,
    pub sd: f64,
    pub k_sigma: f64,
    pub threshold: f64,
}

impl ThresholdModel {
    pub fn from_background(background: ArrayView1<f64>, k_sigma: f64) -> Result<Self> {
        let mean = background.mean().ok_or(SeekrError::EmptyBackground)?;
        let sd = background.std(0.0);
        let threshold = mean + sd * k_sigma;
        if threshold.is_nan() {
            warn!("background of {} values has a non-finite threshold; no tile will count as a hit", background.len());
        }
        Ok(Self { mean, sd, k_sigma, threshold })
    }

    pub fn is_hit(&self, r: f64) -> bool {
        r > self.threshold
    }

    pub fn hit_count(&self, correlations: ArrayView1<f64>) -> usize {
        correlations.iter().filter(|&&r| self.is_hit(r)).count()
    }

    /// Fraction of tiles above the threshold. NaN when there are no tiles.
    pub fn hit_rate(&self, correlations: ArrayView1<f64>) -> f64 {
        self.hit_count(correlations) as f64 / correlations.len() as f64
    }
}

impl BackgroundModel for ThresholdModel {
    /// 1.0 for a hit, 0.0 otherwise.
    fn score(&self, r: f64) -> f64 {
        if self.is_hit(r) {
            1.0
        } else {
            0.0
        }
    }
}

/// Empirical percentile rank (0 to 100) within a background distribution.
#[derive(Debug, Clone)]
pub struct PercentileModel {
    sorted: Vec<f64>,
    has_nan: bool,
}

impl PercentileModel {
    pub fn from_background(background: ArrayView1<f64>) -> Result<Self> {
        if background.is_empty() {
            return Err(SeekrError::EmptyBackground);
        }
        let has_nan = background.iter().any(|v| v.is_nan());
        if has_nan {
            warn!("background distribution contains NaN; percentiles against it will be NaN");
        }
        let mut sorted: Vec<f64> = background.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);
        Ok(Self { sorted, has_nan })
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Percentage of background values less than or equal to `r`.
    pub fn percentile(&self, r: f64) -> f64 {
        if r.is_nan() || self.has_nan {
            return f64::NAN;
        }
        let at_or_below = self.sorted.partition_point(|&b| b <= r);
        100.0 * at_or_below as f64 / self.sorted.len() as f64
    }
}

impl BackgroundModel for PercentileModel {
    fn score(&self, r: f64) -> f64 {
        self.percentile(r)
    }
}
