//! # Partitioned Ingest
//!
//! Maps the whole input once, cuts it into roughly one range per worker at
//! line boundaries, and scans the ranges in parallel with one shard each.
//! Simpler than the streaming pipeline and competitive when the file fits
//! the page cache; produces identical output for every input.

use crate::config::PipelineTuning;
use crate::error::TallyError;
use crate::mapper::ChunkedReader;
use crate::shard::Shard;
use memchr::memchr;
use rayon::prelude::*;
use tracing::info;

/// Split `data` into up to `parts` ranges, each ending just after a `\n`
/// (the final range may not).
fn split_at_lines(data: &[u8], parts: usize) -> Vec<&[u8]> {
    let target = (data.len() / parts.max(1)).max(1);
    let mut ranges = Vec::with_capacity(parts);
    let mut rest = data;
    while !rest.is_empty() {
        if rest.len() <= target {
            ranges.push(rest);
            break;
        }
        match memchr(b'\n', &rest[target..]) {
            Some(found) => {
                let cut = target + found + 1;
                ranges.push(&rest[..cut]);
                rest = &rest[cut..];
            }
            None => {
                ranges.push(rest);
                break;
            }
        }
    }
    ranges
}

/// Scan the file in one pass, returning one shard per range.
pub fn run(reader: &ChunkedReader, tuning: &PipelineTuning) -> Result<Vec<Shard>, TallyError> {
    if reader.is_empty() {
        return Ok(Vec::new());
    }
    let workers = tuning.resolved_workers();
    let map = reader.map_all()?;
    info!(workers, input_len = reader.len(), "starting partitioned ingest");

    split_at_lines(&map, workers)
        .par_iter()
        .map(|range| {
            let mut shard = Shard::with_capacity(tuning.shard_capacity)?;
            shard.consume_lines(range)?;
            Ok(shard)
        })
        .collect()
}
