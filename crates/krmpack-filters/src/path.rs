//! Path-prefix selection and re-rooting filters.

use krmpack_core::annotations::{ANNOTATION_PATH, ANNOTATION_PATH_INTERNAL};
use krmpack_core::Resource;

/// Keeps (or excludes) resources by the prefix of their internal path
/// annotation.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    /// The path prefix to match.
    pub path: String,
    /// Invert the selection: drop matching resources instead.
    pub exclude: bool,
}

impl PathFilter {
    /// Returns the resources selected by the prefix rule.
    #[must_use]
    pub fn filter(&self, items: Vec<Resource>) -> Vec<Resource> {
        items
            .into_iter()
            .filter(|item| {
                let matches = item
                    .annotation(ANNOTATION_PATH_INTERNAL)
                    .unwrap_or("")
                    .starts_with(&self.path);
                matches != self.exclude
            })
            .collect()
    }
}

/// Re-roots each resource's file under a directory.
///
/// The file's base name is kept and both path annotations are rewritten to
/// `<path>/<base>`. Resources without a tracked path are left alone.
/// Idempotent for resources already rooted under `path`.
#[derive(Debug, Clone, Default)]
pub struct SetPathFilter {
    /// Target directory, without trailing slash.
    pub path: String,
}

impl SetPathFilter {
    /// Applies the re-rooting to every resource in place.
    pub fn filter(&self, items: &mut [Resource]) {
        for item in items.iter_mut() {
            let Some(current) = item
                .annotation(ANNOTATION_PATH_INTERNAL)
                .map(ToString::to_string)
            else {
                continue;
            };

            let base = current.rsplit('/').next().unwrap_or(current.as_str());
            let rerooted = format!("{}/{base}", self.path);

            item.set_annotation(ANNOTATION_PATH_INTERNAL, rerooted.clone());
            item.set_annotation(ANNOTATION_PATH, rerooted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, path: &str) -> Resource {
        Resource::from_yaml(&format!(
            "\
apiVersion: v1
kind: Service
metadata:
  name: {name}
  annotations:
    config.kubernetes.io/path: {path}
    internal.config.kubernetes.io/path: {path}
"
        ))
        .unwrap()
    }

    #[test]
    fn test_path_filter_keeps_matching() {
        let items = vec![
            resource("a", "upstream/a.yaml"),
            resource("b", "local/b.yaml"),
        ];
        let kept = PathFilter {
            path: "upstream".to_string(),
            exclude: false,
        }
        .filter(items);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name(), "a");
    }

    #[test]
    fn test_path_filter_excludes_matching() {
        let items = vec![
            resource("a", "upstream/a.yaml"),
            resource("b", "local/b.yaml"),
        ];
        let kept = PathFilter {
            path: "upstream".to_string(),
            exclude: true,
        }
        .filter(items);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name(), "b");
    }

    #[test]
    fn test_set_path_reroots_base_name() {
        let mut items = vec![resource("a", "old/dir/a.yaml")];
        SetPathFilter {
            path: "upstream".to_string(),
        }
        .filter(&mut items);

        assert_eq!(
            items[0].annotation(ANNOTATION_PATH),
            Some("upstream/a.yaml")
        );
        assert_eq!(
            items[0].annotation(ANNOTATION_PATH_INTERNAL),
            Some("upstream/a.yaml")
        );
    }

    #[test]
    fn test_set_path_is_idempotent() {
        let mut items = vec![resource("a", "a.yaml")];
        let filter = SetPathFilter {
            path: "upstream".to_string(),
        };
        filter.filter(&mut items);
        let first = items[0].clone();
        filter.filter(&mut items);
        assert_eq!(items[0], first);
    }

    #[test]
    fn test_set_path_skips_untracked_resources() {
        let mut items =
            vec![Resource::from_yaml("apiVersion: v1\nkind: Service\nmetadata:\n  name: s\n").unwrap()];
        SetPathFilter {
            path: "upstream".to_string(),
        }
        .filter(&mut items);
        assert_eq!(items[0].annotation(ANNOTATION_PATH), None);
    }
}
