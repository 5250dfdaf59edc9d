//! Pascal VOC XML reader.
//!
//! One XML file per image, same stem, in a parallel annotations directory.
//! An `<object>` contributes a detection only when it has both a `<name>`
//! and a complete `<bndbox>`; anything less is skipped. The `<size>`
//! element, when present, records the image dimensions the box coordinates
//! refer to.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::warn;
use roxmltree::{Document, Node};

use super::bbox::BBoxXYWH;
use super::model::{Annotation, Dataset, Detection};
use crate::error::LabelforgeError;

const VOC_EXTENSION: &str = "xml";

/// Parsed content of a single VOC annotation file.
#[derive(Clone, Debug, Default)]
pub struct VocAnnotationFile {
    /// Detections in canonical form, in document order.
    pub detections: Vec<Detection>,
    /// Declared image dimensions from `<size>`, when present and positive.
    pub size: Option<(u32, u32)>,
}

/// Read a Pascal VOC dataset from an image tree and a parallel annotation
/// directory.
///
/// A missing or unparseable XML file degrades to zero annotations for that
/// image, with a warning.
pub fn read_voc_directory(
    images_dir: &Path,
    annotations_dir: &Path,
) -> Result<Dataset, LabelforgeError> {
    let images = super::collect_image_files(images_dir);

    let mut annotations = BTreeMap::new();
    let mut reference_sizes = BTreeMap::new();
    let mut class_names = BTreeSet::new();

    for (image_id, image_path) in &images {
        let xml_path = annotations_dir
            .join(image_path.file_stem().unwrap_or_default())
            .with_extension(VOC_EXTENSION);

        let parsed = if xml_path.is_file() {
            match read_annotation_file(&xml_path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(
                        "Skipping malformed annotation file {}: {}",
                        xml_path.display(),
                        err
                    );
                    VocAnnotationFile::default()
                }
            }
        } else {
            warn!("No annotations file found: {}", xml_path.display());
            VocAnnotationFile::default()
        };

        for detection in &parsed.detections {
            class_names.insert(detection.class_name.clone());
        }
        if let Some(size) = parsed.size {
            reference_sizes.insert(image_id.clone(), size);
        }
        annotations.insert(
            image_id.clone(),
            parsed
                .detections
                .into_iter()
                .map(Annotation::Detection)
                .collect(),
        );
    }

    Ok(Dataset {
        classes: class_names.into_iter().collect(),
        images,
        annotations,
        reference_sizes,
    })
}

/// Parse one VOC XML file.
pub fn read_annotation_file(path: &Path) -> Result<VocAnnotationFile, LabelforgeError> {
    let text = fs::read_to_string(path)?;
    let document = Document::parse(&text).map_err(|source| LabelforgeError::VocXmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;
    let root = document.root_element();

    let size = root
        .children()
        .find(|node| node.has_tag_name("size"))
        .and_then(extract_size);

    let mut detections = Vec::new();
    for object in root.descendants().filter(|node| node.has_tag_name("object")) {
        let name = child_text(&object, "name").filter(|name| !name.is_empty());
        let bbox = object
            .children()
            .find(|node| node.has_tag_name("bndbox"))
            .and_then(extract_bbox);

        // incomplete objects contribute nothing
        let (Some(name), Some(bbox)) = (name, bbox) else {
            continue;
        };
        detections.push(Detection::new(bbox, name));
    }

    Ok(VocAnnotationFile { detections, size })
}

fn child_text(node: &Node, name: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(name))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
}

/// All four corners must be present and numeric; fractional values truncate.
fn extract_bbox(bndbox: Node) -> Option<BBoxXYWH> {
    let corner = |name: &str| {
        child_text(&bndbox, name)
            .and_then(|text| text.parse::<f64>().ok())
            .map(|value| value as i32)
    };
    Some(BBoxXYWH::from_corners(
        corner("xmin")?,
        corner("ymin")?,
        corner("xmax")?,
        corner("ymax")?,
    ))
}

fn extract_size(size: Node) -> Option<(u32, u32)> {
    let dimension = |name: &str| {
        child_text(&size, name)
            .and_then(|text| text.parse::<u32>().ok())
            .filter(|value| *value > 0)
    };
    Some((dimension("width")?, dimension("height")?))
}
