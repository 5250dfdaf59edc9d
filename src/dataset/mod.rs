//! Dataset ingestion: format readers and the canonical in-memory index.
//!
//! Each supported on-disk layout (plain image folder, Pascal VOC, COCO,
//! YOLO) has a reader that walks the layout once and produces the same
//! [`Dataset`] index, so everything downstream of ingestion is
//! format-agnostic.
//!
//! # Design Principles
//!
//! 1. **Canonical Format**: every box encoding converts into absolute-pixel
//!    XYWH ([`BBoxXYWH`]) at parse time.
//!
//! 2. **Permissive Parsing**: malformed records are skipped with a logged
//!    warning, and a missing or wholly malformed annotation file degrades to
//!    zero annotations for that image rather than failing the read.
//!
//! 3. **Deterministic Iteration**: image ids are file names held in a
//!    `BTreeMap`, so a dataset built twice from the same tree iterates
//!    identically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LabelforgeError;

mod bbox;
pub mod io_coco_json;
pub mod io_image_folder;
pub mod io_voc_xml;
pub mod io_yolo;
mod model;

pub use bbox::BBoxXYWH;
pub use model::{Annotation, Classification, Dataset, DatasetEntry, Detection};

/// Image file extensions accepted by every reader, matched case-insensitively.
pub const IMAGE_FILE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// On-disk annotation encodings supported for object detection uploads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoxFormat {
    #[default]
    PascalVoc,
    Coco,
    Yolo,
}

impl Dataset {
    /// Reads a folder-per-class classification layout.
    pub fn from_image_folder(root: impl AsRef<Path>) -> Result<Dataset, LabelforgeError> {
        io_image_folder::read_image_folder(root.as_ref())
    }

    /// Reads a Pascal VOC layout: images plus a parallel directory of
    /// same-stem XML files.
    pub fn from_pascal_voc(
        images_dir: impl AsRef<Path>,
        annotations_dir: impl AsRef<Path>,
    ) -> Result<Dataset, LabelforgeError> {
        io_voc_xml::read_voc_directory(images_dir.as_ref(), annotations_dir.as_ref())
    }

    /// Reads a COCO layout: images plus a single JSON annotation file.
    pub fn from_coco(
        images_dir: impl AsRef<Path>,
        annotations_file: impl AsRef<Path>,
    ) -> Result<Dataset, LabelforgeError> {
        io_coco_json::read_coco_directory(images_dir.as_ref(), annotations_file.as_ref())
    }

    /// Reads a YOLO layout: images, a parallel directory of same-stem `.txt`
    /// label files, and a `data.yaml`-style class config.
    pub fn from_yolo(
        images_dir: impl AsRef<Path>,
        labels_dir: impl AsRef<Path>,
        config_file: impl AsRef<Path>,
    ) -> Result<Dataset, LabelforgeError> {
        io_yolo::read_yolo_directory(
            images_dir.as_ref(),
            labels_dir.as_ref(),
            config_file.as_ref(),
        )
    }

    /// Dispatches to the matching detection reader for `box_format`.
    ///
    /// For [`BoxFormat::Coco`] the `annotations_path` is the JSON file; for
    /// the other formats it is the label directory. `config_file` is only
    /// consulted by the YOLO reader.
    pub fn from_format(
        box_format: BoxFormat,
        images_dir: impl AsRef<Path>,
        annotations_path: impl AsRef<Path>,
        config_file: impl AsRef<Path>,
    ) -> Result<Dataset, LabelforgeError> {
        match box_format {
            BoxFormat::Coco => Dataset::from_coco(images_dir, annotations_path),
            BoxFormat::PascalVoc => Dataset::from_pascal_voc(images_dir, annotations_path),
            BoxFormat::Yolo => Dataset::from_yolo(images_dir, annotations_path, config_file),
        }
    }
}

/// True when `path` has one of the accepted image extensions.
pub(crate) fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_FILE_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

/// Walks `directory` recursively and returns file-name to absolute-path for
/// every accepted image file.
///
/// Later files shadow earlier ones with the same name, matching the
/// one-id-per-name index contract.
pub(crate) fn collect_image_files(directory: &Path) -> BTreeMap<String, PathBuf> {
    let mut images = BTreeMap::new();
    for entry in WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
    {
        let path = entry.path();
        if !has_image_extension(path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        images.insert(name.to_string(), absolute_path(path));
    }
    images
}

/// Resolves `path` to an absolute form, preferring the canonical path when
/// the file exists.
pub(crate) fn absolute_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_matching_is_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b/photo.JPG")));
        assert!(has_image_extension(Path::new("photo.jpeg")));
        assert!(has_image_extension(Path::new("photo.Png")));
        assert!(!has_image_extension(Path::new("photo.bmp")));
        assert!(!has_image_extension(Path::new("photo")));
    }

    #[test]
    fn collect_image_files_walks_recursively() {
        let temp = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(temp.path().join("cats")).expect("mkdir");
        std::fs::write(temp.path().join("cats/one.jpg"), b"x").expect("write");
        std::fs::write(temp.path().join("two.PNG"), b"x").expect("write");
        std::fs::write(temp.path().join("notes.txt"), b"x").expect("write");

        let images = collect_image_files(temp.path());
        assert_eq!(images.len(), 2);
        assert!(images.contains_key("one.jpg"));
        assert!(images.contains_key("two.PNG"));
        assert!(images.values().all(|p| p.is_absolute()));
    }
}
