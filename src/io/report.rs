//! CSV persistence for hit-rate matrices, scan tables and reference
//! statistics.

use crate::error::SeekrError;
use crate::kmer::KmerSpace;
use crate::normalize::ReferenceStats;
use anyhow::{bail, Context, Result};
use ndarray::Array1;
use std::path::Path;

const REF_STATS_HEADER: [&str; 3] = ["kmer", "mean", "sd"];

/// Format a float for the CSV outputs; non-finite values are written as
/// `nan`, `inf` and `-inf`.
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "inf".to_string()
        } else {
            "-inf".to_string()
        }
    } else {
        value.to_string()
    }
}

/// Transcript x query matrix of hit rates, one row per transcript.
pub fn write_hit_matrix(
    output_path: &Path,
    query_names: &[String],
    rows: &[(String, Vec<f64>)],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Error creating '{}'", output_path.display()))?;
    let mut header = vec!["transcript".to_string()];
    header.extend(query_names.iter().cloned());
    writer.write_record(&header)?;

    for (id, rates) in rows {
        let mut record = vec![id.clone()];
        record.extend(rates.iter().map(|&r| format_value(r)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Per-window table indexed by window start: one column per query.
pub fn write_window_table(
    output_path: &Path,
    query_names: &[String],
    starts: &[usize],
    columns: &[Array1<f64>],
) -> Result<()> {
    if columns.len() != query_names.len() {
        bail!(
            "{} columns for {} queries in '{}'",
            columns.len(),
            query_names.len(),
            output_path.display()
        );
    }
    if let Some(column) = columns.iter().find(|c| c.len() != starts.len()) {
        bail!(
            "column of {} values for {} windows in '{}'",
            column.len(),
            starts.len(),
            output_path.display()
        );
    }

    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Error creating '{}'", output_path.display()))?;
    let mut header = vec!["start".to_string()];
    header.extend(query_names.iter().cloned());
    writer.write_record(&header)?;

    for (row, start) in starts.iter().enumerate() {
        let mut record = vec![start.to_string()];
        record.extend(columns.iter().map(|c| format_value(c[row])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Save reference statistics as `kmer,mean,sd` rows in k-mer space order.
pub fn write_ref_stats(output_path: &Path, space: &KmerSpace, stats: &ReferenceStats) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("Error creating '{}'", output_path.display()))?;
    writer.write_record(REF_STATS_HEADER)?;
    for ((kmer, &mean), &sd) in space.kmers().iter().zip(stats.mean()).zip(stats.sd()) {
        writer.write_record([kmer.clone(), format_value(mean), format_value(sd)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Load statistics saved by [`write_ref_stats`], checking that every row
/// lines up with the k-mer at the same index of `space`.
pub fn read_ref_stats(input_path: &Path, space: &KmerSpace) -> Result<ReferenceStats> {
    let mut reader = csv::Reader::from_path(input_path)
        .with_context(|| format!("Error opening '{}'", input_path.display()))?;
    if reader.headers()?.iter().ne(REF_STATS_HEADER) {
        bail!(
            "'{}' does not start with a kmer,mean,sd header",
            input_path.display()
        );
    }

    let mut mean = Vec::with_capacity(space.len());
    let mut sd = Vec::with_capacity(space.len());
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let kmer = record.get(0).unwrap_or_default();
        if space.kmer(index) != Some(kmer) {
            return Err(SeekrError::ReferenceStatsMismatch {
                k: space.k(),
                reason: format!(
                    "row {} holds '{kmer}', expected '{}'",
                    index + 1,
                    space.kmer(index).unwrap_or("<none>")
                ),
            }
            .into());
        }
        mean.push(parse_field(&record, 1, input_path)?);
        sd.push(parse_field(&record, 2, input_path)?);
    }
    if mean.len() != space.len() {
        return Err(SeekrError::ReferenceStatsMismatch {
            k: space.k(),
            reason: format!("{} rows, expected 4^{} = {}", mean.len(), space.k(), space.len()),
        }
        .into());
    }

    let stats = ReferenceStats::from_parts(space, Array1::from(mean), Array1::from(sd))
        .with_context(|| format!("Reference statistics in '{}'", input_path.display()))?;
    Ok(stats)
}

fn parse_field(record: &csv::StringRecord, field: usize, path: &Path) -> Result<f64> {
    let raw = record.get(field).unwrap_or_default();
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("Invalid number '{raw}' in '{}'", path.display()))
}
