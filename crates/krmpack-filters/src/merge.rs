//! Identity-keyed resource merging.

use std::collections::HashMap;

use krmpack_core::{Resource, ResourceId};

/// Merges duplicate resources in a list by identity.
///
/// Two resources are the same iff their `(apiVersion, kind, namespace,
/// name)` identities match. Each duplicated identity collapses to a single
/// resource whose fields are the union of all versions, with later (pulled)
/// values winning on conflicting leaves. The output is stable: first-seen
/// order is preserved and new identities stay appended at the end.
///
/// Malformed documents (no KRM identity) pass through untouched in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeFilter;

impl MergeFilter {
    /// Merges the list.
    #[must_use]
    pub fn filter(&self, items: Vec<Resource>) -> Vec<Resource> {
        let mut index: HashMap<ResourceId, usize> = HashMap::new();
        let mut merged: Vec<Resource> = Vec::new();

        for item in items {
            if !item.is_krm() {
                merged.push(item);
                continue;
            }

            let id = item.id();
            match index.get(&id) {
                Some(&position) => merged[position].merge_from(&item),
                None => {
                    index.insert(id, merged.len());
                    merged.push(item);
                }
            }
        }

        merged
    }
}
