//! Package directory reading and writing.
//!
//! The reader owns the document-boundary and per-file packing conventions:
//! one file may hold one or more documents separated by `---`, and every
//! document read is tagged with path and index bookkeeping annotations so
//! later filters can re-derive file placement. The writer strips that
//! bookkeeping again before serializing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use krmpack_core::annotations::{
    strip_internal_annotations, ANNOTATION_INDEX, ANNOTATION_INDEX_INTERNAL, ANNOTATION_PATH,
    ANNOTATION_PATH_INTERNAL,
};
use krmpack_core::Resource;
use walkdir::WalkDir;

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

/// Reads every YAML file under `dir` into a resource list.
///
/// Files are visited in sorted order for determinism. Each document is
/// annotated with its source path (relative to `dir`) and its index within
/// the file.
pub fn read_package(dir: &Path) -> Result<Vec<Resource>> {
    let mut items = Vec::new();

    let mut files: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_yaml(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    for file in files {
        let relative = file
            .strip_prefix(dir)
            .unwrap_or(&file)
            .to_string_lossy()
            .into_owned();
        let contents = fs::read_to_string(&file)
            .with_context(|| format!("failed to read {}", file.display()))?;

        let documents = Resource::parse_all(&contents)
            .with_context(|| format!("failed to parse {}", file.display()))?;

        for (index, mut resource) in documents.into_iter().enumerate() {
            resource.set_annotation(ANNOTATION_PATH, relative.clone());
            resource.set_annotation(ANNOTATION_PATH_INTERNAL, relative.clone());
            resource.set_annotation(ANNOTATION_INDEX, index.to_string());
            resource.set_annotation(ANNOTATION_INDEX_INTERNAL, index.to_string());
            items.push(resource);
        }
    }

    Ok(items)
}

/// Writes the resource list back under `dir`, grouped by path annotation.
///
/// Documents sharing a file are ordered by their index annotation and
/// separated by `---`. Bookkeeping annotations never reach disk.
pub fn write_package(dir: &Path, items: &[Resource]) -> Result<()> {
    // group by file, preserving first-seen file order
    let mut file_order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<(usize, Resource)>> = HashMap::new();

    for item in items {
        let path = item
            .annotation(ANNOTATION_PATH_INTERNAL)
            .or_else(|| item.annotation(ANNOTATION_PATH))
            .unwrap_or("resources.yaml")
            .to_string();
        let index = item
            .annotation(ANNOTATION_INDEX_INTERNAL)
            .or_else(|| item.annotation(ANNOTATION_INDEX))
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(usize::MAX);

        let mut clean = item.clone();
        strip_internal_annotations(&mut clean);

        if !grouped.contains_key(&path) {
            file_order.push(path.clone());
        }
        grouped.entry(path).or_default().push((index, clean));
    }

    for path in file_order {
        let Some(mut documents) = grouped.remove(&path) else {
            continue;
        };
        documents.sort_by_key(|(index, _)| *index);

        let target = dir.join(&path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let rendered = documents
            .iter()
            .map(|(_, resource)| resource.to_yaml())
            .collect::<krmpack_core::Result<Vec<_>>>()?
            .join("---\n");

        fs::write(&target, rendered)
            .with_context(|| format!("failed to write {}", target.display()))?;
    }

    Ok(())
}
