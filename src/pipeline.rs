//! Scoring pipelines built from the shared primitives:
//! tile -> count -> standardize -> correlate -> calibrate.
//!
//! [`global_stats`] turns the calibrated tiles of every transcript into hit
//! rates; [`scan`] reports per-window correlations and percentiles for
//! individual sequences.

pub mod global_stats;
pub mod scan;

use crate::correlate::kmer_pearson;
use crate::error::SeekrError;
use crate::io::report::{read_ref_stats, write_ref_stats};
use crate::io::{SequenceReader, SequenceRecord};
use crate::kmer::{space_size, KmerSpace};
use crate::normalize::ReferenceStats;
use crate::tile::tile_seq;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use ndarray::{Array1, Array2};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reference, background and query inputs shared by both subcommands.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// FASTA of named query sequences to score against.
    #[clap(short, long)]
    pub queries: PathBuf,

    /// FASTA of the reference population used to standardize k-mer counts.
    #[clap(short, long, required_unless_present = "ref_stats", conflicts_with = "ref_stats")]
    pub reference: Option<PathBuf>,

    /// Prefix of saved reference statistics (`<prefix>_<k>mers_refstats.csv`),
    /// used instead of --reference.
    #[clap(long)]
    pub ref_stats: Option<PathBuf>,

    /// FASTA of the background population scored against each query
    /// (defaults to the reference population).
    #[clap(short, long)]
    pub background: Option<PathBuf>,

    /// Save the fitted reference statistics under this prefix.
    #[clap(long)]
    pub save_ref_stats: Option<PathBuf>,
}

/// Where reference statistics come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSource {
    /// Fit from a FASTA population.
    Fasta(PathBuf),
    /// Load `<prefix>_<k>mers_refstats.csv` for each k.
    Saved(PathBuf),
}

/// Validated [`InputArgs`].
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub queries: PathBuf,
    pub reference: ReferenceSource,
    pub background: Option<PathBuf>,
    pub save_ref_stats: Option<PathBuf>,
}

impl InputConfig {
    pub fn from_args(args: &InputArgs) -> Result<Self> {
        let reference = match (&args.reference, &args.ref_stats) {
            (Some(path), None) => ReferenceSource::Fasta(path.clone()),
            (None, Some(prefix)) => ReferenceSource::Saved(prefix.clone()),
            (Some(_), Some(_)) => bail!("--reference and --ref-stats are mutually exclusive"),
            (None, None) => return Err(SeekrError::EmptyReference.into()),
        };
        if matches!(reference, ReferenceSource::Saved(_)) && args.background.is_none() {
            bail!("--background is required when reference statistics are loaded with --ref-stats");
        }
        if matches!(reference, ReferenceSource::Saved(_)) && args.save_ref_stats.is_some() {
            bail!("--save-ref-stats needs a reference population to fit (--reference)");
        }
        if let Some(prefix) = &args.save_ref_stats {
            check_parent_exists(prefix)?;
        }

        Ok(InputConfig {
            queries: args.queries.clone(),
            reference,
            background: args.background.clone(),
            save_ref_stats: args.save_ref_stats.clone(),
        })
    }
}

/// Tile length and stride.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tiling {
    pub length: usize,
    pub stride: usize,
}

impl Tiling {
    pub fn new(length: usize, stride: usize) -> Result<Self, SeekrError> {
        if length == 0 || stride == 0 {
            return Err(SeekrError::InvalidTiling { length, stride });
        }
        Ok(Self { length, stride })
    }
}

/// Reject a k before anything is read.
pub fn validate_k(k: usize) -> Result<(), SeekrError> {
    space_size(k).map(|_| ())
}

/// Fail early when the directory an output will be written into is missing.
pub fn check_parent_exists(path: &Path) -> Result<()> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            bail!("Output directory does not exist: {}", parent.display());
        }
    }
    Ok(())
}

/// `<prefix><suffix>`, keeping the prefix's directory.
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Sequences loaded once and reused for every k.
#[derive(Debug)]
pub struct LoadedInputs {
    pub queries: Vec<SequenceRecord>,
    reference: Option<Vec<SequenceRecord>>,
    background: Option<Vec<SequenceRecord>>,
    config: InputConfig,
}

impl LoadedInputs {
    /// Read queries (sorted by name), the reference population and the
    /// background population.
    pub fn load(config: &InputConfig) -> Result<Self> {
        info!("Loading queries from {}...", config.queries.display());
        let queries = sorted_queries(SequenceReader::from_path(&config.queries)?)?;
        if queries.is_empty() {
            bail!("No query sequences in {}", config.queries.display());
        }

        let reference = match &config.reference {
            ReferenceSource::Fasta(path) => {
                info!("Loading reference population from {}...", path.display());
                let records = SequenceReader::from_path(path)?;
                if records.is_empty() {
                    return Err(SeekrError::EmptyReference)
                        .with_context(|| format!("No sequences in {}", path.display()));
                }
                Some(records)
            }
            ReferenceSource::Saved(_) => None,
        };

        let background = match &config.background {
            Some(path) => {
                info!("Loading background population from {}...", path.display());
                Some(SequenceReader::from_path(path)?)
            }
            None => None,
        };

        Ok(Self { queries, reference, background, config: config.clone() })
    }

    fn background_records(&self) -> Result<&[SequenceRecord]> {
        self.background
            .as_deref()
            .or(self.reference.as_deref())
            .ok_or_else(|| anyhow!("no background population available"))
    }

    fn reference_stats(&self, space: &KmerSpace) -> Result<ReferenceStats> {
        match (&self.config.reference, &self.reference) {
            (ReferenceSource::Saved(prefix), _) => {
                let path = prefixed_path(prefix, &format!("_{}mers_refstats.csv", space.k()));
                info!("Loading {}-mer reference statistics from {}...", space.k(), path.display());
                read_ref_stats(&path, space)
            }
            (ReferenceSource::Fasta(_), Some(records)) => {
                let seqs: Vec<&[u8]> = records.iter().map(|r| r.seq.as_slice()).collect();
                let stats = ReferenceStats::from_sequences(space, &seqs)?;
                if let Some(prefix) = &self.config.save_ref_stats {
                    let path = prefixed_path(prefix, &format!("_{}mers_refstats.csv", space.k()));
                    write_ref_stats(&path, space, &stats)?;
                    info!("Reference statistics written to {}", path.display());
                }
                Ok(stats)
            }
            (ReferenceSource::Fasta(path), None) => {
                bail!("reference population {} was not loaded", path.display())
            }
        }
    }
}

/// Queries sorted by name; duplicate names are rejected.
fn sorted_queries(mut queries: Vec<SequenceRecord>) -> Result<Vec<SequenceRecord>> {
    let mut seen = HashSet::new();
    for query in &queries {
        if !seen.insert(query.id.as_str()) {
            bail!("Duplicate query name: {}", query.id);
        }
    }
    queries.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(queries)
}

/// A query's standardized profile and its background correlations.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub profile: Array1<f64>,
    pub background: Array1<f64>,
}

/// Everything needed to score sequences at one k. Shared read-only.
#[derive(Debug)]
pub struct KmerModel {
    pub space: KmerSpace,
    pub stats: ReferenceStats,
    pub signatures: Vec<Signature>,
}

impl KmerModel {
    pub fn build(k: usize, inputs: &LoadedInputs) -> Result<Self> {
        let space = KmerSpace::build(k)?;
        let stats = inputs.reference_stats(&space)?;

        let background_records = inputs.background_records()?;
        let background_seqs: Vec<&[u8]> =
            background_records.iter().map(|r| r.seq.as_slice()).collect();
        let background_profiles = stats.target_norm(&space, &background_seqs)?;
        info!(
            "Scoring {} background sequences against {} queries at k={k}...",
            background_seqs.len(),
            inputs.queries.len()
        );

        let signatures = inputs
            .queries
            .iter()
            .map(|query| -> Result<Signature, SeekrError> {
                let profile = stats.target_norm_one(&space, &query.seq)?;
                let background = kmer_pearson(profile.view(), background_profiles.view())?;
                Ok(Signature { name: query.id.clone(), profile, background })
            })
            .collect::<Result<Vec<_>, SeekrError>>()?;

        Ok(Self { space, stats, signatures })
    }

    pub fn query_names(&self) -> Vec<String> {
        self.signatures.iter().map(|s| s.name.clone()).collect()
    }

    /// Standardized profiles of every tile of `seq`.
    pub fn tile_profiles(&self, seq: &[u8], tiling: Tiling) -> Result<TileProfiles, SeekrError> {
        let tiles = tile_seq(seq, tiling.length, tiling.stride)?;
        let starts = tiles.iter().map(|t| t.start).collect();
        let seqs: Vec<&[u8]> = tiles.iter().map(|t| t.seq.as_slice()).collect();
        let profiles = self.stats.target_norm(&self.space, &seqs)?;
        Ok(TileProfiles { starts, profiles })
    }

    /// Correlation of every tile against every query, in signature order.
    pub fn correlate_tiles(&self, tiles: &TileProfiles) -> Result<Vec<Array1<f64>>, SeekrError> {
        self.signatures
            .iter()
            .map(|signature| kmer_pearson(signature.profile.view(), tiles.profiles.view()))
            .collect()
    }
}

/// One standardized profile per tile, with the tile's start offset.
#[derive(Debug, Clone)]
pub struct TileProfiles {
    pub starts: Vec<usize>,
    pub profiles: Array2<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, seq: &str) -> SequenceRecord {
        SequenceRecord { id: id.to_string(), seq: seq.as_bytes().to_vec() }
    }

    #[test]
    fn test_queries_sorted_by_name() {
        let queries = vec![record("repeatE", "ACGT"), record("repeatA", "TTGA"), record("repeatC", "GGCA")];
        let sorted = sorted_queries(queries).unwrap();
        let names: Vec<&str> = sorted.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(names, vec!["repeatA", "repeatC", "repeatE"]);
    }

    #[test]
    fn test_duplicate_queries_rejected() {
        let queries = vec![record("repeatA", "ACGT"), record("repeatA", "TTGA")];
        assert!(sorted_queries(queries).is_err());
    }

    #[test]
    fn test_prefixed_path() {
        let path = prefixed_path(Path::new("out/run1"), "_6mers_2sd.csv");
        assert_eq!(path, PathBuf::from("out/run1_6mers_2sd.csv"));
    }

    #[test]
    fn test_tiling_validation() {
        assert!(Tiling::new(1000, 100).is_ok());
        assert!(matches!(
            Tiling::new(0, 100),
            Err(SeekrError::InvalidTiling { length: 0, stride: 100 })
        ));
        assert!(Tiling::new(1000, 0).is_err());
    }

    #[test]
    fn test_input_config_requires_background_for_saved_stats() {
        let args = InputArgs {
            queries: PathBuf::from("queries.fa"),
            reference: None,
            ref_stats: Some(PathBuf::from("stats")),
            background: None,
            save_ref_stats: None,
        };
        assert!(InputConfig::from_args(&args).is_err());

        let args = InputArgs { background: Some(PathBuf::from("bg.fa")), ..args };
        let config = InputConfig::from_args(&args).unwrap();
        assert_eq!(config.reference, ReferenceSource::Saved(PathBuf::from("stats")));
    }

    #[test]
    fn test_input_config_missing_save_dir() {
        let args = InputArgs {
            queries: PathBuf::from("queries.fa"),
            reference: Some(PathBuf::from("ref.fa")),
            ref_stats: None,
            background: None,
            save_ref_stats: Some(PathBuf::from("/nonexistent-seekr-dir/stats")),
        };
        assert!(InputConfig::from_args(&args).is_err());
    }
}
