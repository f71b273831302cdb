//! # Tuning
//!
//! Knobs for the aggregation engine. Every field has a safe default and
//! presets bundle common choices; `workers == 0` and `stride == 0` mean
//! "resolve from the host".

use serde::{Deserialize, Serialize};

/// Default stride, expressed in pages.
pub const DEFAULT_STRIDE_PAGES: usize = 4096;

/// How the input is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IngestMode {
    /// Bounded producer/consumer pipeline over mapped windows.
    #[default]
    Streaming,
    /// One mapping of the whole file, split at line boundaries and scanned
    /// in parallel.
    Partitioned,
}

/// Tuning for the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineTuning {
    /// Consumer thread count. 0 = logical core count (1 if unavailable).
    pub workers: usize,
    /// Chunk stride in bytes. 0 = [`DEFAULT_STRIDE_PAGES`] pages. The
    /// stride is a throughput knob, not a correctness parameter; any value
    /// from one byte up to the file size produces identical output.
    pub stride: usize,
    /// Lower clamp on the adaptive queue bound, as a multiple of `workers`.
    pub queue_floor_factor: usize,
    /// Starting queue bound, as a multiple of `workers`.
    pub queue_start_factor: usize,
    /// Upper clamp on the adaptive queue bound, as a multiple of `workers`.
    pub queue_ceil_factor: usize,
    /// Pre-sized capacity of each worker shard.
    pub shard_capacity: usize,
    /// Ingest strategy.
    pub mode: IngestMode,
}

impl Default for PipelineTuning {
    fn default() -> Self {
        Self {
            workers: 0,
            stride: 0,
            queue_floor_factor: 2,
            queue_start_factor: 3,
            queue_ceil_factor: 5,
            shard_capacity: crate::shard::DEFAULT_SHARD_CAPACITY,
            mode: IngestMode::Streaming,
        }
    }
}

/// Preset profiles bundling common tuning choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningProfile {
    Balanced,
    HighThroughput,
    MemorySaver,
}

impl PipelineTuning {
    pub fn from_profile(profile: TuningProfile) -> Self {
        match profile {
            TuningProfile::Balanced => Self::balanced(),
            TuningProfile::HighThroughput => Self::high_throughput(),
            TuningProfile::MemorySaver => Self::memory_saver(),
        }
    }

    pub fn balanced() -> Self {
        Self::default()
    }

    /// Deeper queue and larger shard tables; trades memory for throughput.
    pub fn high_throughput() -> Self {
        Self {
            queue_floor_factor: 3,
            queue_start_factor: 4,
            queue_ceil_factor: 8,
            shard_capacity: 1 << 16,
            ..Self::default()
        }
    }

    /// Shallow queue and smaller shard tables for constrained hosts.
    pub fn memory_saver() -> Self {
        Self {
            queue_floor_factor: 1,
            queue_start_factor: 2,
            queue_ceil_factor: 3,
            shard_capacity: 1 << 13,
            ..Self::default()
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_mode(mut self, mode: IngestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Effective consumer count.
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Effective stride in bytes, given the host page size.
    pub fn resolved_stride(&self, page_size: usize) -> usize {
        if self.stride > 0 {
            return self.stride;
        }
        DEFAULT_STRIDE_PAGES * page_size.max(1)
    }

    /// Queue bounds `(floor, start, ceiling)` for `workers` consumers.
    pub fn queue_bounds(&self, workers: usize) -> (usize, usize, usize) {
        let floor = (self.queue_floor_factor * workers).max(1);
        let ceil = (self.queue_ceil_factor * workers).max(floor);
        let start = (self.queue_start_factor * workers).clamp(floor, ceil);
        (floor, start, ceil)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_to_host_values() {
        let tuning = PipelineTuning::default();
        assert!(tuning.resolved_workers() >= 1);
        assert_eq!(tuning.resolved_stride(4096), DEFAULT_STRIDE_PAGES * 4096);
        assert_eq!(tuning.with_stride(512).resolved_stride(4096), 512);
    }

    #[test]
    fn test_queue_bounds_are_clamped() {
        let tuning = PipelineTuning::default();
        assert_eq!(tuning.queue_bounds(4), (8, 12, 20));
        // A degenerate configuration still yields a usable queue.
        let degenerate = PipelineTuning {
            queue_floor_factor: 0,
            queue_start_factor: 0,
            queue_ceil_factor: 0,
            ..PipelineTuning::default()
        };
        assert_eq!(degenerate.queue_bounds(4), (1, 1, 1));
    }

    #[test]
    fn test_tuning_roundtrips_through_json() {
        let tuning = PipelineTuning::high_throughput().with_workers(6);
        let raw = serde_json::to_string(&tuning).unwrap();
        let back: PipelineTuning = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, tuning);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let tuning: PipelineTuning =
            serde_json::from_str(r#"{"workers": 2, "mode": "partitioned"}"#).unwrap();
        assert_eq!(tuning.workers, 2);
        assert_eq!(tuning.mode, IngestMode::Partitioned);
        assert_eq!(tuning.queue_start_factor, 3);
    }
}
