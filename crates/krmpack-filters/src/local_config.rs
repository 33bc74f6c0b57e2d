//! Local-config resource selection.

use krmpack_core::Resource;

/// Selects the resources eligible for packaging.
///
/// A resource is local configuration if it carries the well-known
/// `config.kubernetes.io/local-config` annotation. Unless
/// `include_local_config` is set, such resources are excluded from the
/// returned selection. Selection only reads: the working set itself is never
/// mutated or shrunk by a push.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConfigFilter {
    /// Include local-config resources in the selection.
    pub include_local_config: bool,
}

impl LocalConfigFilter {
    /// Returns the packaging-eligible subset of `items`.
    #[must_use]
    pub fn select<'a>(&self, items: &'a [Resource]) -> Vec<&'a Resource> {
        items
            .iter()
            .filter(|item| self.include_local_config || !item.is_local_config())
            .collect()
    }
}
