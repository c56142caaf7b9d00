//! Access index: distinct tuple catalogue, profile → tuples, tuple → owners.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::model::{AccessAssignment, AccessTuple};

/// Deduplicated view of an assignment table.
///
/// Built once per table; every lookup the reconciler needs is answered from
/// here. Maps are ordered so iteration is deterministic for a fixed input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessIndex {
    catalogue: Vec<AccessTuple>,
    profiles: BTreeMap<String, BTreeSet<AccessTuple>>,
    owners: BTreeMap<AccessTuple, BTreeSet<String>>,
}

impl AccessIndex {
    pub fn build(assignments: &[AccessAssignment]) -> Self {
        let mut seen: HashSet<&AccessTuple> = HashSet::new();
        let mut catalogue = Vec::new();
        let mut profiles: BTreeMap<String, BTreeSet<AccessTuple>> = BTreeMap::new();
        let mut owners: BTreeMap<AccessTuple, BTreeSet<String>> = BTreeMap::new();

        for row in assignments {
            if seen.insert(&row.access) {
                catalogue.push(row.access.clone());
            }
            profiles
                .entry(row.profile.clone())
                .or_default()
                .insert(row.access.clone());
            owners
                .entry(row.access.clone())
                .or_default()
                .insert(row.profile.clone());
        }

        log::debug!(
            "access index: {} rows, {} profiles, {} distinct tuples",
            assignments.len(),
            profiles.len(),
            catalogue.len()
        );

        Self { catalogue, profiles, owners }
    }

    /// Distinct tuples in first-seen order.
    pub fn catalogue(&self) -> &[AccessTuple] {
        &self.catalogue
    }

    /// Profile names, sorted.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    pub fn contains_profile(&self, profile: &str) -> bool {
        self.profiles.contains_key(profile)
    }

    pub fn access_of(&self, profile: &str) -> Option<&BTreeSet<AccessTuple>> {
        self.profiles.get(profile)
    }

    /// Every profile holding `access`, selected or not.
    pub fn owners_of(&self, access: &AccessTuple) -> Option<&BTreeSet<String>> {
        self.owners.get(access)
    }

    pub fn is_empty(&self) -> bool {
        self.catalogue.is_empty()
    }

    /// Rows of the given profiles, sorted by profile then tuple.
    ///
    /// Profiles missing from the index contribute nothing.
    pub fn assignments_for<S: AsRef<str>>(&self, selection: &[S]) -> Vec<AccessAssignment> {
        let wanted: BTreeSet<&str> = selection.iter().map(|s| s.as_ref()).collect();
        wanted
            .into_iter()
            .filter_map(|p| self.profiles.get_key_value(p))
            .flat_map(|(profile, set)| {
                set.iter()
                    .map(move |access| AccessAssignment::new(profile.clone(), access.clone()))
            })
            .collect()
    }
}
