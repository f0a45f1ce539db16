use anyhow::{bail, Context, Result};
use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// A FASTA record: identifier (header text up to the first whitespace) and
/// raw sequence bytes as found in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// Whole-file FASTA reader, transparently handling gzipped input.
#[derive(Debug)]
pub struct SequenceReader;

impl SequenceReader {
    /// Read every record of `path`, in file order.
    pub fn from_path(path: &Path) -> Result<Vec<SequenceRecord>> {
        let file = File::open(path)
            .with_context(|| format!("Error opening file '{}'", path.display()))?;
        if file.metadata()?.len() == 0 {
            bail!("File is empty: '{}'", path.display());
        }

        let records = if is_gzipped(path) {
            Self::from_reader(MultiGzDecoder::new(file))
        } else {
            Self::from_reader(file)
        }
        .with_context(|| format!("Error reading FASTA records from '{}'", path.display()))?;

        debug!("Read {} records from '{}'", records.len(), path.display());
        Ok(records)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<SequenceRecord>> {
        fasta::Reader::new(reader)
            .records()
            .map(|record| -> Result<SequenceRecord> {
                let record = record?;
                Ok(SequenceRecord {
                    id: record.id().to_string(),
                    seq: record.seq().to_vec(),
                })
            })
            .collect()
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}
