//! # Merger & Reporter
//!
//! Combines per-worker shards into one sorted summary and renders it. The
//! per-key reduction uses the aggregate's commutative, associative combine,
//! so shard order is immaterial; with integer-tenths sums the result is
//! bit-identical for any worker count.

use crate::shard::Shard;
use crate::stats::MetaInfo;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::fmt::Write;
use tracing::debug;

/// One name with its fully reduced aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub name: Vec<u8>,
    pub meta: MetaInfo,
}

/// Final aggregation result, sorted by name bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    entries: Vec<SummaryEntry>,
}

impl Summary {
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of records observed across all names.
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|entry| entry.meta.count).sum()
    }

    /// Aggregate for `name`, or the identity when the name never occurred.
    pub fn get(&self, name: &[u8]) -> MetaInfo {
        match self
            .entries
            .binary_search_by(|entry| entry.name.as_slice().cmp(name))
        {
            Ok(at) => self.entries[at].meta,
            Err(_) => MetaInfo::IDENTITY,
        }
    }

    /// Render `name=min/mean/max` entries joined by `", "`, in ascending
    /// byte-lexicographic name order, one fractional digit per number.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&String::from_utf8_lossy(&entry.name));
            let _ = write!(out, "={}", entry.meta);
        }
        out
    }
}

/// Reduce per-shard aggregates into one sorted summary.
pub fn merge_shards(shards: &[Shard]) -> Summary {
    let mut names: FxHashSet<&[u8]> = FxHashSet::default();
    for shard in shards {
        for (name, _) in shard.enumerate() {
            names.insert(name);
        }
    }
    let mut names: Vec<&[u8]> = names.into_iter().collect();
    names.sort_unstable();

    let entries: Vec<SummaryEntry> = names
        .par_iter()
        .map(|name| SummaryEntry {
            name: name.to_vec(),
            meta: shards
                .iter()
                .fold(MetaInfo::IDENTITY, |acc, shard| acc.combine(&shard.lookup(name))),
        })
        .collect();

    debug!(names = entries.len(), shards = shards.len(), "merged shards");
    Summary { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Tenths;

    fn shard_with(lines: &[u8]) -> Shard {
        let mut shard = Shard::default();
        shard.consume_lines(lines).unwrap();
        shard
    }

    #[test]
    fn test_merge_collapses_duplicate_keys() {
        let shards = vec![shard_with(b"a;1.0\nb;5.0\n"), shard_with(b"a;3.0\n")];
        let summary = merge_shards(&shards);
        assert_eq!(summary.len(), 2);
        let a = summary.get(b"a");
        assert_eq!(a.min, Tenths(10));
        assert_eq!(a.max, Tenths(30));
        assert_eq!(a.count, 2);
    }

    #[test]
    fn test_entries_sorted_by_name_bytes() {
        let shards = vec![shard_with(b"zulu;0.0\nalpha;0.0\nmike;0.0\n")];
        let summary = merge_shards(&shards);
        let names: Vec<&[u8]> = summary.entries().iter().map(|e| e.name.as_slice()).collect();
        assert_eq!(names, vec![&b"alpha"[..], b"mike", b"zulu"]);
    }

    #[test]
    fn test_get_missing_name_is_identity() {
        let summary = merge_shards(&[shard_with(b"a;1.0\n")]);
        assert!(summary.get(b"nope").is_empty());
    }

    #[test]
    fn test_render_format() {
        let summary = merge_shards(&[shard_with(b"a;1.0\nb;2.0\na;3.0\n")]);
        assert_eq!(summary.render(), "a=1.0/2.0/3.0, b=2.0/2.0/2.0");
        assert_eq!(summary.total_count(), 3);
    }

    #[test]
    fn test_render_empty_summary() {
        assert_eq!(merge_shards(&[]).render(), "");
    }
}
