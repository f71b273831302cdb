//! Typed failure modes for the aggregation engine.
//!
//! Setup failures (`InputNotFound`, `InputNotReadable`, the first `MapFailed`)
//! surface before any worker starts. Failures inside workers are recorded,
//! raise the stop flag, and are re-raised by the main thread once the
//! pipeline has drained.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TallyError {
    #[error("input file not found or not a regular file: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("input file not readable: {}", path.display())]
    InputNotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("memory map failed at offset {offset}")]
    MapFailed {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("allocation failed while {context}")]
    OutOfMemory { context: &'static str },

    /// A record that violates the input grammar. The chunk-boundary
    /// algorithm guarantees workers only ever see complete lines, so this
    /// indicates a bug or a malformed input file; there is no recovery path.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolated(String),
}
