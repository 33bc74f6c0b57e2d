//! File-name rewriting filters.

use krmpack_core::annotations::{
    ANNOTATION_INDEX, ANNOTATION_INDEX_INTERNAL, ANNOTATION_PATH, ANNOTATION_PATH_INTERNAL,
};
use krmpack_core::Resource;

const PATH_KEYS: [&str; 2] = [ANNOTATION_PATH, ANNOTATION_PATH_INTERNAL];
const INDEX_KEYS: [&str; 2] = [ANNOTATION_INDEX, ANNOTATION_INDEX_INTERNAL];

/// Lower-cases a name and maps `/` and `:` to `_`, `.` to `-`.
fn sanitize_file_name(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '/' | ':' => '_',
            '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Renames each resource's file after its apiVersion, kind, and name.
///
/// Rewrites the path annotations to `<apiversion>_<kind>_<name>.yaml`,
/// preserving any directory component, and resets index annotations to 0
/// since each resource now owns its file. Idempotent: re-applying to
/// already-renamed resources changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct GvknFileNameFilter;

impl GvknFileNameFilter {
    /// Applies the renaming to every resource in place.
    pub fn filter(&self, items: &mut [Resource]) {
        for item in items.iter_mut() {
            let file_name = format!(
                "{}.yaml",
                sanitize_file_name(&format!(
                    "{}_{}_{}",
                    item.api_version(),
                    item.kind(),
                    item.name()
                ))
            );

            for key in PATH_KEYS {
                if let Some(current) = item.annotation(key).map(ToString::to_string) {
                    let renamed = match current.rsplit_once('/') {
                        Some((dir, _)) => format!("{dir}/{file_name}"),
                        None => file_name.clone(),
                    };
                    item.set_annotation(key, renamed);
                }
            }
            for key in INDEX_KEYS {
                if item.annotation(key).is_some() {
                    item.set_annotation(key, "0");
                }
            }
        }
    }
}

/// Collapses every resource's file placement onto a single file.
///
/// Each resource keeps its position through a zero-based index annotation
/// reassigned in visitation order, so documents stay orderable within the
/// shared file. Re-applying renumbers identically.
#[derive(Debug, Clone, Default)]
pub struct SingleFileFilter {
    /// Base name of the shared output file (sanitized, `.yaml` appended).
    pub file_name: String,
}

impl SingleFileFilter {
    /// Applies the collapse to every resource in place.
    pub fn filter(&self, items: &mut [Resource]) {
        let file_name = format!("{}.yaml", sanitize_file_name(&self.file_name));

        for (index, item) in items.iter_mut().enumerate() {
            for key in PATH_KEYS {
                if item.annotation(key).is_some() {
                    item.set_annotation(key, file_name.clone());
                }
            }
            for key in INDEX_KEYS {
                if item.annotation(key).is_some() {
                    item.set_annotation(key, index.to_string());
                }
            }
        }
    }
}
