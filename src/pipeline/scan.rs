//! Per-sequence scanning: correlation of every window against every query,
//! and where each window falls in the query's background distribution.

use super::{validate_k, InputArgs, InputConfig, KmerModel, LoadedInputs, Tiling};
use crate::background::{BackgroundModel, PercentileModel, ThresholdModel};
use crate::error::SeekrError;
use crate::io::report::write_window_table;
use crate::io::SequenceReader;
use anyhow::{bail, Context, Result};
use clap::Args;
use ndarray::Array1;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Args, Clone)]
pub struct ScanArgs {
    /// FASTA of sequences to scan; each record is scanned on its own.
    #[clap(short = 'f', long)]
    pub fasta: PathBuf,

    #[clap(flatten)]
    pub inputs: InputArgs,

    /// Directory receiving `<id>_scan.csv` and `<id>_percentile.csv`.
    #[clap(short, long)]
    pub output_dir: PathBuf,

    /// k-mer length.
    #[clap(short, long, default_value_t = 6)]
    pub k: usize,

    /// Window length.
    #[clap(short = 'w', long, default_value_t = 1000)]
    pub window: usize,

    /// Distance between window starts.
    #[clap(short = 's', long, default_value_t = 100)]
    pub stride: usize,

    /// Windows correlating above mean + k_sigma * sd of the background are
    /// reported as hits.
    #[clap(long, default_value_t = 3.0)]
    pub k_sigma: f64,
}

/// Validated [`ScanArgs`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub fasta: PathBuf,
    pub inputs: InputConfig,
    pub output_dir: PathBuf,
    pub k: usize,
    pub tiling: Tiling,
    pub k_sigma: f64,
}

impl ScanConfig {
    pub fn from_args(args: &ScanArgs) -> Result<Self> {
        validate_k(args.k)?;
        let tiling = Tiling::new(args.window, args.stride)?;
        if !args.k_sigma.is_finite() {
            bail!("k-sigma ({}) must be a finite number", args.k_sigma);
        }
        if !args.output_dir.is_dir() {
            bail!("Output directory does not exist: {}", args.output_dir.display());
        }

        Ok(ScanConfig {
            fasta: args.fasta.clone(),
            inputs: InputConfig::from_args(&args.inputs)?,
            output_dir: args.output_dir.clone(),
            k: args.k,
            tiling,
            k_sigma: args.k_sigma,
        })
    }
}

/// Calibration of each query's background, built once per query.
#[derive(Debug)]
pub struct QueryDistributions {
    pub percentiles: Vec<PercentileModel>,
    pub thresholds: Vec<ThresholdModel>,
}

impl QueryDistributions {
    pub fn build(model: &KmerModel, k_sigma: f64) -> Result<Self, SeekrError> {
        let mut percentiles = Vec::with_capacity(model.signatures.len());
        let mut thresholds = Vec::with_capacity(model.signatures.len());
        for signature in &model.signatures {
            percentiles.push(PercentileModel::from_background(signature.background.view())?);
            thresholds.push(ThresholdModel::from_background(signature.background.view(), k_sigma)?);
        }
        Ok(Self { percentiles, thresholds })
    }
}

/// Per-window scores of one sequence, one column per query.
#[derive(Debug, Clone)]
pub struct SequenceScan {
    pub starts: Vec<usize>,
    pub correlations: Vec<Array1<f64>>,
    pub percentiles: Vec<Array1<f64>>,
}

impl SequenceScan {
    /// Windows above each query's hit threshold.
    pub fn hit_counts(&self, distributions: &QueryDistributions) -> Vec<usize> {
        distributions
            .thresholds
            .iter()
            .zip(&self.correlations)
            .map(|(threshold, r)| threshold.hit_count(r.view()))
            .collect()
    }
}

/// Tile `seq`, correlate every window with every query and rank each
/// correlation within that query's background.
pub fn scan_sequence(
    model: &KmerModel,
    distributions: &QueryDistributions,
    seq: &[u8],
    tiling: Tiling,
) -> Result<SequenceScan, SeekrError> {
    let tiles = model.tile_profiles(seq, tiling)?;
    let correlations = model.correlate_tiles(&tiles)?;
    let percentiles = distributions
        .percentiles
        .iter()
        .zip(&correlations)
        .map(|(background, r)| background.score_all(r.view()))
        .collect();
    Ok(SequenceScan { starts: tiles.starts, correlations, percentiles })
}

/// File-name-safe version of a sequence id.
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "sequence".to_string()
    } else {
        cleaned
    }
}

/// Output stems handed out so far in one run. Ids that sanitize to a stem
/// already taken (duplicates, or `a|b` vs `a:b`) get a numeric suffix.
#[derive(Debug, Default)]
struct OutputStems {
    used: HashSet<String>,
}

impl OutputStems {
    fn claim(&mut self, id: &str) -> String {
        let base = sanitize_id(id);
        let mut stem = base.clone();
        let mut n = 1;
        while !self.used.insert(stem.clone()) {
            n += 1;
            stem = format!("{base}_{n}");
        }
        if n > 1 {
            warn!("Output name for sequence {id} is already taken; writing {stem}_*.csv instead");
        }
        stem
    }
}

fn write_scan(output_dir: &Path, stem: &str, query_names: &[String], scan: &SequenceScan) -> Result<()> {
    let scan_path = output_dir.join(format!("{stem}_scan.csv"));
    write_window_table(&scan_path, query_names, &scan.starts, &scan.correlations)?;
    let percentile_path = output_dir.join(format!("{stem}_percentile.csv"));
    write_window_table(&percentile_path, query_names, &scan.starts, &scan.percentiles)?;
    info!("Results written to {} and {}", scan_path.display(), percentile_path.display());
    Ok(())
}

pub fn run(args: &ScanArgs) -> Result<()> {
    let config = ScanConfig::from_args(args)?;

    info!("Starting k-mer scan...");
    info!(
        "Parameters: k={}, window={}, stride={}, k_sigma={}",
        config.k, config.tiling.length, config.tiling.stride, config.k_sigma
    );

    let records = SequenceReader::from_path(&config.fasta)?;
    info!("Loaded {} sequences to scan", records.len());
    let inputs = LoadedInputs::load(&config.inputs)?;

    let model = KmerModel::build(config.k, &inputs)?;
    let distributions = QueryDistributions::build(&model, config.k_sigma)
        .context("Building query background distributions")?;
    for (signature, background) in model.signatures.iter().zip(&distributions.percentiles) {
        info!("{}: {} non-NaN background correlations", signature.name, background.len());
    }
    let query_names = model.query_names();
    let mut stems = OutputStems::default();

    for record in &records {
        let scan = match scan_sequence(&model, &distributions, &record.seq, config.tiling) {
            Ok(scan) => scan,
            Err(e) => {
                warn!("Skipping sequence {}: {e}", record.id);
                continue;
            }
        };
        info!("{}: {} windows", record.id, scan.starts.len());
        for (name, hits) in query_names.iter().zip(scan.hit_counts(&distributions)) {
            info!("  {name}: {hits} windows above mean + {} sd of background", config.k_sigma);
        }
        let stem = stems.claim(&record.id);
        write_scan(&config.output_dir, &stem, &query_names, &scan)?;
    }

    Ok(())
}
