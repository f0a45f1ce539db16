use crate::error::{Result, SeekrError};

/// A window of a sequence, uppercased, starting at `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub start: usize,
    pub seq: Vec<u8>,
}

/// Split `seq` into windows of `length` bases starting every `stride` bases.
///
/// Windows start at `0, stride, 2 * stride, ...` while the start lies inside
/// the sequence, so the trailing windows may be shorter than `length`.
/// `stride > length` is allowed and leaves gaps between tiles.
pub fn tile_seq(seq: &[u8], length: usize, stride: usize) -> Result<Vec<Tile>> {
    if length == 0 || stride == 0 {
        return Err(SeekrError::InvalidTiling { length, stride });
    }
    let upper = seq.to_ascii_uppercase();
    Ok((0..upper.len())
        .step_by(stride)
        .map(|start| Tile {
            start,
            seq: upper[start..(start + length).min(upper.len())].to_vec(),
        })
        .collect())
}
