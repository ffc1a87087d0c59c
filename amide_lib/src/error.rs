use thiserror::Error;

/// Failures surfaced by rendering and analysis calls.
///
/// An ROI that misses a dataset is not an error, see
/// [`AnalysisFrameResult::empty`](crate::analysis::AnalysisFrameResult::empty).
#[derive(Error, Debug)]
pub enum EngineError {
    /// A working buffer could not be allocated, the call produced no result.
    #[error("cannot allocate {what} ({bytes} bytes)")]
    ResourceExhaustion { what: &'static str, bytes: usize },

    /// Geometry handed over by a collaborator breaks an invariant,
    /// e.g. non-orthonormal axes.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Parameter outside of its allowed domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Cancel flag was raised while the call was running.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Allocate a buffer of `len` copies of `value`, reporting failure instead of aborting.
pub(crate) fn alloc_vec<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| EngineError::ResourceExhaustion {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    buffer.resize(len, value);
    Ok(buffer)
}
