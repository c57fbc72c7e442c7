use std::collections::HashMap;
use std::hash::Hash;

/// Accumulators keyed by a composite key, kept in first-seen key order.
///
/// Iteration order only depends on the order keys were first inserted, so a
/// stable sort over the result keeps ties in first-seen order.
#[derive(Debug)]
pub(crate) struct Grouped<K, A> {
    index: HashMap<K, usize>,
    groups: Vec<(K, A)>,
}

impl<K, A> Default for Grouped<K, A> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, A: Default> Grouped<K, A> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Accumulator for `key`, created on first use
    pub(crate) fn entry(&mut self, key: K) -> &mut A {
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.groups.len();
                self.index.insert(key.clone(), idx);
                self.groups.push((key, A::default()));
                idx
            }
        };
        &mut self.groups[idx].1
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &(K, A)> {
        self.groups.iter()
    }

    pub(crate) fn into_vec(self) -> Vec<(K, A)> {
        self.groups
    }
}

/// Count occurrences, most frequent first; ties keep first-seen order
pub(crate) fn count_values<K, I>(values: I) -> Vec<(K, usize)>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts: Grouped<K, usize> = Grouped::new();
    for value in values {
        *counts.entry(value) += 1;
    }

    let mut counts = counts.into_vec();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Single-pass mean and sample variance (Welford)
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub(crate) fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn mean(&self) -> f64 {
        self.mean
    }

    /// Variance with denominator n - 1; undefined below two samples
    pub(crate) fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        Some(self.m2 / (self.count - 1) as f64)
    }
}
