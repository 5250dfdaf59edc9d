//! Plain image folder reader for classification datasets.
//!
//! Layout: any tree of images under a root, where the immediate parent
//! directory of each image names its class. The class vocabulary is taken
//! from the subdirectory names directly under the root, which can diverge
//! from the per-image classes when images are nested more than one level
//! deep; that behavior is kept as-is.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::model::{Annotation, Classification, Dataset};
use crate::error::LabelforgeError;

/// Read a folder-per-class tree into a dataset.
///
/// Every accepted image file under `root` (recursively) becomes one entry
/// with a single classification annotation named after its parent
/// directory.
pub fn read_image_folder(root: &Path) -> Result<Dataset, LabelforgeError> {
    let images = super::collect_image_files(root);

    let mut annotations = BTreeMap::new();
    for (image_id, image_path) in &images {
        let class_name = image_path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        annotations.insert(
            image_id.clone(),
            vec![Annotation::Classification(Classification::new(class_name))],
        );
    }

    Ok(Dataset {
        classes: top_level_class_names(root)?,
        images,
        annotations,
        reference_sizes: BTreeMap::new(),
    })
}

/// Sorted distinct names of the directories directly under `root`.
fn top_level_class_names(root: &Path) -> Result<Vec<String>, LabelforgeError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    names.dedup();
    Ok(names)
}
