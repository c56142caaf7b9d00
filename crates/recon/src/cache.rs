//! Memoization of index builds and analysis runs, keyed by content fingerprint.
//!
//! A cache is an ordinary value: each session owns its own, nothing is
//! shared process-wide. Entries are evicted oldest-first once `capacity`
//! is reached.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use blake3::{Hash, Hasher};
use serde::Serialize;

use crate::conflict::ConflictIndex;
use crate::engine::run_indexed;
use crate::error::ReconError;
use crate::index::AccessIndex;
use crate::model::{AccessAssignment, AnalysisResult, ConflictRule, MatrixScope, ReconOptions};

pub const DEFAULT_CAPACITY: usize = 64;

/// Both indexes for one pair of input tables.
#[derive(Debug)]
pub struct PreparedTables {
    pub fingerprint: Hash,
    pub index: AccessIndex,
    pub conflicts: ConflictIndex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub tables: usize,
    pub results: usize,
}

pub struct ReconCache {
    capacity: usize,
    tables: Bounded<Arc<PreparedTables>>,
    results: Bounded<Arc<AnalysisResult>>,
    hits: u64,
    misses: u64,
}

impl Default for ReconCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ReconCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tables: Bounded::default(),
            results: Bounded::default(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index the two tables, reusing a previous build of identical content.
    pub fn prepare(
        &mut self,
        assignments: &[AccessAssignment],
        rules: &[ConflictRule],
    ) -> Arc<PreparedTables> {
        let key = fingerprint_tables(assignments, rules);
        if let Some(found) = self.tables.get(&key) {
            self.hits += 1;
            return Arc::clone(found);
        }
        self.misses += 1;
        let prepared = Arc::new(PreparedTables {
            fingerprint: key,
            index: AccessIndex::build(assignments),
            conflicts: ConflictIndex::build(rules),
        });
        self.tables.insert(key, Arc::clone(&prepared), self.capacity);
        prepared
    }

    /// Reconcile `selected` against prepared tables, memoized on
    /// (tables, selection, options). Errors are never cached.
    pub fn analyze<S: AsRef<str>>(
        &mut self,
        tables: &PreparedTables,
        selected: &[S],
        options: &ReconOptions,
    ) -> Result<Arc<AnalysisResult>, ReconError> {
        let key = fingerprint_run(&tables.fingerprint, selected, options);
        if let Some(found) = self.results.get(&key) {
            self.hits += 1;
            log::debug!("recon cache hit {}", key.to_hex());
            return Ok(Arc::clone(found));
        }
        self.misses += 1;
        let result = Arc::new(run_indexed(
            &tables.index,
            &tables.conflicts,
            selected,
            options,
            None,
        )?);
        self.results.insert(key, Arc::clone(&result), self.capacity);
        Ok(result)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            tables: self.tables.len(),
            results: self.results.len(),
        }
    }
}

/// Insertion-ordered map with oldest-first eviction.
struct Bounded<V> {
    entries: HashMap<Hash, V>,
    order: VecDeque<Hash>,
}

impl<V> Default for Bounded<V> {
    fn default() -> Self {
        Self { entries: HashMap::new(), order: VecDeque::new() }
    }
}

impl<V> Bounded<V> {
    fn get(&self, key: &Hash) -> Option<&V> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: Hash, value: V, capacity: usize) {
        while self.entries.len() >= capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        if self.entries.insert(key, value).is_none() {
            self.order.push_back(key);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

/// BLAKE3 over both tables. Every string is length-prefixed so field
/// boundaries cannot shift between rows.
pub fn fingerprint_tables(assignments: &[AccessAssignment], rules: &[ConflictRule]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"accessgrid.tables.v1");
    write_len(&mut hasher, assignments.len());
    for row in assignments {
        write_str(&mut hasher, &row.profile);
        for field in row.access.fields() {
            write_str(&mut hasher, field);
        }
    }
    write_len(&mut hasher, rules.len());
    for rule in rules {
        write_str(&mut hasher, &rule.profile_a);
        write_str(&mut hasher, &rule.profile_b);
        write_str(&mut hasher, &rule.reason);
    }
    hasher.finalize()
}

/// Fingerprint of one run. Selection order is significant: it fixes the
/// matrix column order.
pub fn fingerprint_run<S: AsRef<str>>(
    tables: &Hash,
    selected: &[S],
    options: &ReconOptions,
) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"accessgrid.run.v1");
    hasher.update(tables.as_bytes());
    write_len(&mut hasher, selected.len());
    for profile in selected {
        write_str(&mut hasher, profile.as_ref());
    }
    hasher.update(match options.matrix_scope {
        MatrixScope::Catalogue => b"c",
        MatrixScope::Selection => b"s",
    });
    hasher.finalize()
}

fn write_len(hasher: &mut Hasher, len: usize) {
    hasher.update(&(len as u64).to_le_bytes());
}

fn write_str(hasher: &mut Hasher, s: &str) {
    write_len(hasher, s.len());
    hasher.update(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AccessTuple;

    fn rows() -> Vec<AccessAssignment> {
        vec![
            AccessAssignment::new("Finance", AccessTuple::new("ERP", "SAP", "GL", "Post Entry")),
            AccessAssignment::new("Audit", AccessTuple::new("ERP", "SAP", "GL", "Post Entry")),
            AccessAssignment::new("Ops", AccessTuple::new("ERP", "SAP", "GL", "Run Batch")),
        ]
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = fingerprint_tables(&rows(), &[]);
        let b = fingerprint_tables(&rows(), &[]);
        assert_eq!(a, b);

        let mut changed = rows();
        changed[0].access.menu = "Post Entries".into();
        assert_ne!(a, fingerprint_tables(&changed, &[]));

        let rules = [ConflictRule::new("Finance", "Audit", "SoD")];
        assert_ne!(a, fingerprint_tables(&rows(), &rules));
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        let left = [AccessAssignment::new("ab", AccessTuple::new("c", "", "", ""))];
        let right = [AccessAssignment::new("a", AccessTuple::new("bc", "", "", ""))];
        assert_ne!(fingerprint_tables(&left, &[]), fingerprint_tables(&right, &[]));
    }

    #[test]
    fn run_fingerprint_depends_on_selection_order_and_scope() {
        let t = fingerprint_tables(&rows(), &[]);
        let opts = ReconOptions::default();
        let ab = fingerprint_run(&t, &["Finance", "Audit"], &opts);
        let ba = fingerprint_run(&t, &["Audit", "Finance"], &opts);
        assert_ne!(ab, ba);
        let narrowed = ReconOptions { matrix_scope: MatrixScope::Selection };
        assert_ne!(ab, fingerprint_run(&t, &["Finance", "Audit"], &narrowed));
    }

    #[test]
    fn repeated_analysis_hits_cache() {
        let mut cache = ReconCache::new(8);
        let tables = cache.prepare(&rows(), &[]);
        let again = cache.prepare(&rows(), &[]);
        assert!(Arc::ptr_eq(&tables, &again));

        let first = cache.analyze(&tables, &["Finance", "Audit"], &ReconOptions::default()).unwrap();
        let second = cache.analyze(&tables, &["Finance", "Audit"], &ReconOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.results, 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache = ReconCache::default();
        let tables = cache.prepare(&rows(), &[]);
        assert!(cache.analyze(&tables, &["Finance"], &ReconOptions::default()).is_err());
        assert!(cache.analyze(&tables, &["Finance"], &ReconOptions::default()).is_err());
        assert_eq!(cache.stats().results, 0);
        assert_eq!(cache.stats().misses, 3);
    }

    #[test]
    fn oldest_result_is_evicted_at_capacity() {
        let mut cache = ReconCache::new(2);
        let tables = cache.prepare(&rows(), &[]);
        let opts = ReconOptions::default();
        cache.analyze(&tables, &["Finance", "Audit"], &opts).unwrap();
        cache.analyze(&tables, &["Audit", "Ops"], &opts).unwrap();
        cache.analyze(&tables, &["Finance", "Ops"], &opts).unwrap();
        assert_eq!(cache.stats().results, 2);

        // First selection was evicted, so this is a miss again.
        let misses = cache.stats().misses;
        cache.analyze(&tables, &["Finance", "Audit"], &opts).unwrap();
        assert_eq!(cache.stats().misses, misses + 1);
    }
}
