//! # Tallyrust
//!
//! A high-throughput aggregator for line-oriented measurement files of the
//! form `<name>;<value>\n`, where `<value>` is a signed decimal with exactly
//! one fractional digit. For every distinct name the engine maintains the
//! running minimum, maximum, sum, and count, and renders a sorted
//! `name=min/mean/max` report.
//!
//! Ingestion memory-maps the file in fixed strides and feeds a bounded
//! queue of windows to worker-private shards; lines straddling window
//! boundaries are reassembled in file order before parsing, so every record
//! is counted exactly once regardless of stride or worker count.

pub mod config;
pub mod error;
pub mod mapper;
pub mod parse;
pub mod partitioned;
pub mod pipeline;
pub mod report;
pub mod shard;
pub mod stats;
pub mod test_support;

pub use config::{IngestMode, PipelineTuning, TuningProfile};
pub use error::TallyError;
pub use mapper::ChunkedReader;
pub use report::{Summary, SummaryEntry};
pub use shard::Shard;
pub use stats::{MetaInfo, Tenths};

/// Main handle: an opened input plus the tuning used to aggregate it.
#[derive(Debug)]
pub struct Tally {
    reader: ChunkedReader,
    tuning: PipelineTuning,
}

impl Tally {
    /// Open `path` with default tuning.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, TallyError> {
        Self::with_tuning(path, PipelineTuning::default())
    }

    /// Open `path` with explicit tuning.
    pub fn with_tuning(
        path: impl AsRef<std::path::Path>,
        tuning: PipelineTuning,
    ) -> Result<Self, TallyError> {
        Ok(Self {
            reader: ChunkedReader::open(path)?,
            tuning,
        })
    }

    /// Total input length in bytes.
    pub fn input_len(&self) -> u64 {
        self.reader.len()
    }

    pub fn tuning(&self) -> &PipelineTuning {
        &self.tuning
    }

    /// Aggregate the whole input and return the merged, sorted summary.
    pub fn run(&self) -> Result<Summary, TallyError> {
        let shards = match self.tuning.mode {
            IngestMode::Streaming => pipeline::run(&self.reader, &self.tuning)?,
            IngestMode::Partitioned => partitioned::run(&self.reader, &self.tuning)?,
        };
        Ok(report::merge_shards(&shards))
    }
}
