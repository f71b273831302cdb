//! # Aggregate Model
//!
//! Fixed-point measurement values and the per-name running aggregate.
//!
//! Every input value carries exactly one fractional digit, so the whole
//! engine works in integer tenths: sums never lose precision and the final
//! report is identical for any worker count.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A measurement in tenths: `12.3` is stored as `123`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Tenths(pub i64);

impl Tenths {
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Tenths {
    /// Renders with exactly one fractional digit, e.g. `-0.5`, `12.3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mag = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, mag / 10, mag % 10)
    }
}

/// Running aggregate for one name.
///
/// `combine` is commutative and associative with [`MetaInfo::IDENTITY`] as
/// its identity element, so per-shard aggregates can be reduced in any
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaInfo {
    pub min: Tenths,
    pub max: Tenths,
    pub sum: Tenths,
    pub count: u64,
}

impl MetaInfo {
    /// Folds into anything without effect.
    pub const IDENTITY: MetaInfo = MetaInfo {
        min: Tenths(i64::MAX),
        max: Tenths(i64::MIN),
        sum: Tenths(0),
        count: 0,
    };

    /// Fold a single observed value in.
    #[inline]
    pub fn update(&mut self, value: Tenths) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.sum.0 += value.0;
        self.count += 1;
    }

    /// Componentwise merge of two aggregates.
    pub fn combine(mut self, rhs: &MetaInfo) -> MetaInfo {
        self.min = self.min.min(rhs.min);
        self.max = self.max.max(rhs.max);
        self.sum.0 += rhs.sum.0;
        self.count += rhs.count;
        self
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum.0 as f64 / (10.0 * self.count as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for MetaInfo {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for MetaInfo {
    /// Renders `min/mean/max` with one fractional digit per number.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut mean = format!("{:.1}", self.mean());
        if mean == "-0.0" {
            mean.truncate(0);
            mean.push_str("0.0");
        }
        write!(f, "{}/{}/{}", self.min, mean, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenths_display() {
        assert_eq!(Tenths(0).to_string(), "0.0");
        assert_eq!(Tenths(5).to_string(), "0.5");
        assert_eq!(Tenths(-5).to_string(), "-0.5");
        assert_eq!(Tenths(123).to_string(), "12.3");
        assert_eq!(Tenths(-999).to_string(), "-99.9");
        assert_eq!(Tenths(1000).to_string(), "100.0");
    }

    #[test]
    fn test_update_tracks_extrema_and_count() {
        let mut meta = MetaInfo::IDENTITY;
        meta.update(Tenths(10));
        meta.update(Tenths(30));
        meta.update(Tenths(-20));

        assert_eq!(meta.min, Tenths(-20));
        assert_eq!(meta.max, Tenths(30));
        assert_eq!(meta.sum, Tenths(20));
        assert_eq!(meta.count, 3);
    }

    #[test]
    fn test_combine_is_commutative_with_identity() {
        let mut a = MetaInfo::IDENTITY;
        a.update(Tenths(10));
        a.update(Tenths(20));
        let mut b = MetaInfo::IDENTITY;
        b.update(Tenths(-50));

        assert_eq!(a.combine(&b), b.combine(&a));
        assert_eq!(a.combine(&MetaInfo::IDENTITY), a);
        assert_eq!(MetaInfo::IDENTITY.combine(&a), a);
    }

    #[test]
    fn test_display_renders_min_mean_max() {
        let mut meta = MetaInfo::IDENTITY;
        meta.update(Tenths(10));
        meta.update(Tenths(30));
        assert_eq!(meta.to_string(), "1.0/2.0/3.0");
    }

    #[test]
    fn test_display_never_emits_negative_zero_mean() {
        let mut meta = MetaInfo::IDENTITY;
        meta.update(Tenths(-5));
        meta.update(Tenths(5));
        assert_eq!(meta.to_string(), "-0.5/0.0/0.5");
    }
}
