use thiserror::Error;

/// Failures surfaced by the sampling core. All of them are local to a single
/// call and leave no state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplingError {
    #[error("invalid density {0}: must be a positive, finite number")]
    InvalidDensity(f64),

    #[error("invalid range [{start}, {end}) over {len} elements")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("unknown accessor: {0:?}")]
    UnknownAccessor(String),
}

pub type Result<T, E = SamplingError> = std::result::Result<T, E>;
