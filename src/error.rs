/// Errors raised by the k-mer profiling and scoring primitives.
///
/// Numeric degeneracies (zero variance, zero standard deviation) are not
/// errors; they surface as NaN/Inf values in the returned arrays.
#[derive(thiserror::Error, Debug)]
pub enum SeekrError {
    /// k must be a positive integer.
    #[error("k must be greater than 0 (k={k})")]
    InvalidK { k: usize },
    /// 4^k profile entries cannot be addressed on this platform.
    #[error("k={k} is too large: a profile would need 4^{k} entries")]
    KTooLarge { k: usize },
    /// Tile length and stride must both be positive.
    #[error("tile length and stride must be > 0 (length={length}, stride={stride})")]
    InvalidTiling { length: usize, stride: usize },
    /// A reference population needs at least one member.
    #[error("reference population is empty")]
    EmptyReference,
    /// A background distribution needs at least one value.
    #[error("background distribution is empty")]
    EmptyBackground,
    /// Two profile-space vectors disagree on length.
    #[error("dimension mismatch: expected length {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    /// Persisted reference statistics do not line up with the k-mer space.
    #[error("reference statistics do not match the {k}-mer space: {reason}")]
    ReferenceStatsMismatch { k: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, SeekrError>;
