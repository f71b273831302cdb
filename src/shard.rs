//! # Shard
//!
//! A single worker's mapping from raw-byte name to running aggregate.
//! Shards are owned exclusively by one consumer while ingesting and are
//! merged only after every worker has been joined, so no operation here
//! needs synchronization.

use crate::error::TallyError;
use crate::parse::parse_tenths;
use crate::stats::{MetaInfo, Tenths};
use hashbrown::HashMap;

/// Pre-sized table capacity, large enough to avoid rehashing during
/// steady-state ingestion of typical name cardinalities.
pub const DEFAULT_SHARD_CAPACITY: usize = 1 << 15;

#[derive(Debug, Default)]
pub struct Shard {
    entries: HashMap<Vec<u8>, MetaInfo>,
}

impl Shard {
    /// Create a shard with `capacity` slots reserved up front.
    pub fn with_capacity(capacity: usize) -> Result<Self, TallyError> {
        let mut entries = HashMap::new();
        entries.try_reserve(capacity).map_err(|_| TallyError::OutOfMemory {
            context: "pre-sizing a shard table",
        })?;
        Ok(Self { entries })
    }

    /// Fold `value` into the aggregate for `name`, creating it on first
    /// observation.
    #[inline]
    pub fn accept(&mut self, name: &[u8], value: Tenths) {
        if let Some(meta) = self.entries.get_mut(name) {
            meta.update(value);
        } else {
            let mut meta = MetaInfo::IDENTITY;
            meta.update(value);
            self.entries.insert(name.to_vec(), meta);
        }
    }

    /// Aggregate for `name`, or the identity when absent.
    pub fn lookup(&self, name: &[u8]) -> MetaInfo {
        self.entries.get(name).copied().unwrap_or(MetaInfo::IDENTITY)
    }

    /// All `(name, aggregate)` pairs, in no particular order.
    pub fn enumerate(&self) -> impl Iterator<Item = (&[u8], &MetaInfo)> {
        self.entries.iter().map(|(name, meta)| (name.as_slice(), meta))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scan a body of complete `name;value` lines and fold every record in.
    /// The final line may omit its trailing `\n`.
    pub fn consume_lines(&mut self, mut body: &[u8]) -> Result<(), TallyError> {
        while !body.is_empty() {
            let Some(sep) = memchr::memchr(b';', body) else {
                return Err(TallyError::InternalInvariantViolated(
                    "record without ';' separator in chunk body".into(),
                ));
            };
            let name = &body[..sep];
            let rest = &body[sep + 1..];
            let (value, next) = match memchr::memchr(b'\n', rest) {
                Some(end) => (&rest[..end], &rest[end + 1..]),
                None => (rest, &rest[rest.len()..]),
            };
            if value.len() < 3 {
                return Err(TallyError::InternalInvariantViolated(format!(
                    "record with truncated value field: {:?}",
                    String::from_utf8_lossy(value)
                )));
            }
            self.accept(name, parse_tenths(value));
            body = next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_and_lookup() {
        let mut shard = Shard::with_capacity(16).unwrap();
        shard.accept(b"alpha", Tenths(10));
        shard.accept(b"alpha", Tenths(30));
        shard.accept(b"beta", Tenths(-5));

        let alpha = shard.lookup(b"alpha");
        assert_eq!(alpha.min, Tenths(10));
        assert_eq!(alpha.max, Tenths(30));
        assert_eq!(alpha.count, 2);

        assert_eq!(shard.lookup(b"missing"), MetaInfo::IDENTITY);
        assert_eq!(shard.len(), 2);
    }

    #[test]
    fn test_consume_lines_with_trailing_newline() {
        let mut shard = Shard::default();
        shard.consume_lines(b"a;1.0\nb;2.0\na;3.0\n").unwrap();
        assert_eq!(shard.lookup(b"a").count, 2);
        assert_eq!(shard.lookup(b"b").sum, Tenths(20));
    }

    #[test]
    fn test_consume_lines_without_trailing_newline() {
        let mut shard = Shard::default();
        shard.consume_lines(b"a;1.0\nb;-2.5").unwrap();
        assert_eq!(shard.lookup(b"b").min, Tenths(-25));
        assert_eq!(shard.lookup(b"b").count, 1);
    }

    #[test]
    fn test_consume_lines_rejects_missing_separator() {
        let mut shard = Shard::default();
        assert!(shard.consume_lines(b"no-separator-here\n").is_err());
    }

    #[test]
    fn test_enumerate_covers_all_names() {
        let mut shard = Shard::default();
        shard.consume_lines(b"x;0.1\ny;0.2\nz;0.3\n").unwrap();
        let mut names: Vec<&[u8]> = shard.enumerate().map(|(name, _)| name).collect();
        names.sort_unstable();
        assert_eq!(names, vec![&b"x"[..], b"y", b"z"]);
    }
}
