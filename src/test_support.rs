//! Seeded input generators for tests and benches.

use crate::stats::{MetaInfo, Tenths};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// A generated measurement file body plus its single-threaded reference
/// aggregation.
#[derive(Debug, Clone)]
pub struct GeneratedInput {
    pub body: String,
    pub expected: BTreeMap<String, MetaInfo>,
}

/// Generate `lines` records with names and tenths values drawn from a
/// seeded RNG. Values span `[-99.9, 99.9]`.
pub fn generate_measurements(names: &[&str], lines: usize, seed: u64) -> GeneratedInput {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut body = String::with_capacity(lines * 12);
    let mut expected: BTreeMap<String, MetaInfo> = BTreeMap::new();

    for _ in 0..lines {
        let name = names[rng.random_range(0..names.len())];
        let value = Tenths(rng.random_range(-999..=999));
        body.push_str(name);
        body.push(';');
        body.push_str(&value.to_string());
        body.push('\n');
        expected.entry(name.to_string()).or_default().update(value);
    }

    GeneratedInput { body, expected }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_measurements(&["x", "y"], 100, 42);
        let b = generate_measurements(&["x", "y"], 100, 42);
        assert_eq!(a.body, b.body);
        assert_eq!(a.expected, b.expected);
    }

    #[test]
    fn test_expected_counts_cover_all_lines() {
        let input = generate_measurements(&["x", "y", "z"], 1000, 7);
        let total: u64 = input.expected.values().map(|meta| meta.count).sum();
        assert_eq!(total, 1000);
        assert_eq!(input.body.lines().count(), 1000);
    }
}
