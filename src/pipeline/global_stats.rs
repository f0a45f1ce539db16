//! Batch scoring: hit rate of every transcript against every query.

use super::{check_parent_exists, prefixed_path, validate_k, InputArgs, InputConfig, KmerModel, LoadedInputs, Tiling};
use crate::background::ThresholdModel;
use crate::error::SeekrError;
use crate::io::report::write_hit_matrix;
use crate::io::{SequenceReader, SequenceRecord};
use anyhow::{bail, Context, Result};
use clap::Args;
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Args, Clone)]
pub struct GlobalStatsArgs {
    /// FASTA of transcripts to score.
    #[clap(short = 'f', long)]
    pub transcripts: PathBuf,

    #[clap(flatten)]
    pub inputs: InputArgs,

    /// Output prefix; writes `<prefix>_<k>mers_<k-sigma>sd.csv` per k.
    #[clap(short, long)]
    pub output: PathBuf,

    /// k-mer lengths to score, comma separated.
    #[clap(short, long, value_delimiter = ',', default_value = "6")]
    pub k: Vec<usize>,

    /// Tile length.
    #[clap(short = 'w', long, default_value_t = 1000)]
    pub tile_length: usize,

    /// Distance between tile starts.
    #[clap(short = 's', long, default_value_t = 100)]
    pub tile_stride: usize,

    /// Tiles correlating above mean + k_sigma * sd of the background are hits.
    #[clap(long, default_value_t = 2.0)]
    pub k_sigma: f64,
}

/// Validated [`GlobalStatsArgs`].
#[derive(Debug, Clone)]
pub struct GlobalStatsConfig {
    pub transcripts: PathBuf,
    pub inputs: InputConfig,
    pub output_prefix: PathBuf,
    pub k_values: Vec<usize>,
    pub tiling: Tiling,
    pub k_sigma: f64,
}

impl GlobalStatsConfig {
    pub fn from_args(args: &GlobalStatsArgs) -> Result<Self> {
        if args.k.is_empty() {
            bail!("at least one k must be given");
        }
        for &k in &args.k {
            validate_k(k)?;
        }
        let tiling = Tiling::new(args.tile_length, args.tile_stride)?;
        if !args.k_sigma.is_finite() {
            bail!("k-sigma ({}) must be a finite number", args.k_sigma);
        }
        check_parent_exists(&args.output)?;

        let mut k_values = args.k.clone();
        k_values.sort_unstable();
        k_values.dedup();

        Ok(GlobalStatsConfig {
            transcripts: args.transcripts.clone(),
            inputs: InputConfig::from_args(&args.inputs)?,
            output_prefix: args.output.clone(),
            k_values,
            tiling,
            k_sigma: args.k_sigma,
        })
    }

    pub fn output_path(&self, k: usize) -> PathBuf {
        prefixed_path(&self.output_prefix, &format!("_{k}mers_{}sd.csv", self.k_sigma))
    }
}

/// Hit rate of one transcript against each query, in signature order.
pub fn score_transcript(
    model: &KmerModel,
    thresholds: &[ThresholdModel],
    seq: &[u8],
    tiling: Tiling,
) -> Result<Vec<f64>, SeekrError> {
    let tiles = model.tile_profiles(seq, tiling)?;
    let correlations = model.correlate_tiles(&tiles)?;
    Ok(thresholds
        .iter()
        .zip(&correlations)
        .map(|(threshold, r)| threshold.hit_rate(r.view()))
        .collect())
}

/// Transcript x query hit-rate rows for one k. Transcripts that fail to
/// score are logged and left out.
pub fn hit_rate_rows(
    model: &KmerModel,
    k_sigma: f64,
    transcripts: &[SequenceRecord],
    tiling: Tiling,
) -> Result<Vec<(String, Vec<f64>)>> {
    let thresholds = model
        .signatures
        .iter()
        .map(|signature| -> Result<ThresholdModel> {
            let threshold = ThresholdModel::from_background(signature.background.view(), k_sigma)
                .with_context(|| format!("Background for query {}", signature.name))?;
            debug!(
                "{}: background mean={:.4}, sd={:.4}, threshold={:.4}",
                signature.name, threshold.mean, threshold.sd, threshold.threshold
            );
            Ok(threshold)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(transcripts
        .par_iter()
        .filter_map(|record| match score_transcript(model, &thresholds, &record.seq, tiling) {
            Ok(rates) => Some((record.id.clone(), rates)),
            Err(e) => {
                warn!("Skipping transcript {}: {e}", record.id);
                None
            }
        })
        .collect())
}

pub fn run(args: &GlobalStatsArgs) -> Result<()> {
    // Create configuration from arguments (includes validation)
    let config = GlobalStatsConfig::from_args(args)?;

    info!("Starting global k-mer scoring...");
    info!(
        "Parameters: k_values={:?}, tile_length={}, tile_stride={}, k_sigma={}",
        config.k_values, config.tiling.length, config.tiling.stride, config.k_sigma
    );

    info!("Loading transcripts...");
    let transcripts = SequenceReader::from_path(&config.transcripts)?;
    let total_length: usize = transcripts.iter().map(|r| r.seq.len()).sum();
    info!("Loaded {} transcripts with total length {} bp", transcripts.len(), total_length);

    let inputs = LoadedInputs::load(&config.inputs)?;

    for &k in &config.k_values {
        info!("Processing {k}-mers...");
        let model = KmerModel::build(k, &inputs)?;

        info!("Scoring {} transcripts against {} queries...", transcripts.len(), model.signatures.len());
        let rows = hit_rate_rows(&model, config.k_sigma, &transcripts, config.tiling)?;
        if rows.len() < transcripts.len() {
            warn!("{} of {} transcripts could not be scored", transcripts.len() - rows.len(), transcripts.len());
        }

        let output_path = config.output_path(k);
        write_hit_matrix(&output_path, &model.query_names(), &rows)?;
        info!("Results written to {}", output_path.display());
    }

    Ok(())
}
