//! COCO JSON reader.
//!
//! A single JSON file carries `categories` (id/name), `images`
//! (id/filename/size), and `annotations` (image_id, category_id, bbox).
//! COCO boxes are already `[x, y, width, height]` in absolute pixels, so
//! they map onto the canonical form directly.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use super::bbox::BBoxXYWH;
use super::model::{Annotation, Dataset, Detection};
use crate::error::LabelforgeError;

#[derive(Debug, Deserialize)]
struct CocoFile {
    #[serde(default)]
    categories: Vec<CocoCategory>,
    #[serde(default)]
    images: Vec<CocoImage>,
    #[serde(default)]
    annotations: Vec<CocoAnnotation>,
}

#[derive(Debug, Deserialize)]
struct CocoCategory {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CocoImage {
    id: i64,
    file_name: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CocoAnnotation {
    image_id: i64,
    category_id: i64,
    /// `[x, y, width, height]`; empty means no geometry and is skipped.
    #[serde(default)]
    bbox: Vec<f64>,
}

/// Read a COCO dataset: an image tree plus one annotation JSON file.
///
/// Images listed in the JSON but missing from the annotations list still
/// appear, with zero annotations. Annotations referencing unknown images or
/// categories are dropped with a warning.
pub fn read_coco_directory(
    images_dir: &Path,
    annotations_file: &Path,
) -> Result<Dataset, LabelforgeError> {
    let coco = read_coco_file(annotations_file)?;

    let category_names: BTreeMap<i64, String> = coco
        .categories
        .iter()
        .map(|category| (category.id, category.name.clone()))
        .collect();

    // Only images with an accepted extension make it into the index.
    let mut images = BTreeMap::new();
    let mut image_names: BTreeMap<i64, String> = BTreeMap::new();
    let mut reference_sizes = BTreeMap::new();
    for image in &coco.images {
        let file_path = Path::new(&image.file_name);
        if !super::has_image_extension(file_path) {
            continue;
        }
        let image_id = image.file_name.clone();
        images.insert(
            image_id.clone(),
            super::absolute_path(&images_dir.join(&image.file_name)),
        );
        image_names.insert(image.id, image_id.clone());
        if let (Some(width), Some(height)) = (image.width, image.height) {
            if width > 0 && height > 0 {
                reference_sizes.insert(image_id, (width, height));
            }
        }
    }

    let mut annotations: BTreeMap<String, Vec<Annotation>> = image_names
        .values()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    for ann in &coco.annotations {
        let Some(detection) = detection_from_annotation(ann, &category_names, annotations_file)
        else {
            continue;
        };
        // annotation-only records with no matching image are dropped
        let Some(image_id) = image_names.get(&ann.image_id) else {
            continue;
        };
        if let Some(list) = annotations.get_mut(image_id) {
            list.push(Annotation::Detection(detection));
        }
    }

    let mut classes: Vec<String> = category_names.values().cloned().collect();
    classes.sort();

    Ok(Dataset {
        classes,
        images,
        annotations,
        reference_sizes,
    })
}

/// Read the detections for a single image out of a COCO file.
///
/// Returns the detections plus the image's declared size. An image name
/// absent from the file yields an empty list.
pub fn read_annotations_for_image(
    image_name: &str,
    annotations_file: &Path,
) -> Result<(Vec<Detection>, Option<(u32, u32)>), LabelforgeError> {
    let coco = read_coco_file(annotations_file)?;

    let category_names: BTreeMap<i64, String> = coco
        .categories
        .iter()
        .map(|category| (category.id, category.name.clone()))
        .collect();

    let Some(image) = coco.images.iter().find(|img| img.file_name == image_name) else {
        return Ok((Vec::new(), None));
    };

    let size = match (image.width, image.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Some((width, height)),
        _ => None,
    };

    let detections = coco
        .annotations
        .iter()
        .filter(|ann| ann.image_id == image.id)
        .filter_map(|ann| detection_from_annotation(ann, &category_names, annotations_file))
        .collect();

    Ok((detections, size))
}

fn read_coco_file(path: &Path) -> Result<CocoFile, LabelforgeError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(|source| LabelforgeError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

fn detection_from_annotation(
    ann: &CocoAnnotation,
    category_names: &BTreeMap<i64, String>,
    file: &Path,
) -> Option<Detection> {
    if ann.bbox.is_empty() {
        return None;
    }
    if ann.bbox.len() < 4 {
        warn!(
            "Skipping annotation with short bbox ({} values) in {}",
            ann.bbox.len(),
            file.display()
        );
        return None;
    }
    let Some(class_name) = category_names.get(&ann.category_id) else {
        warn!(
            "Skipping annotation with unknown category id {} in {}",
            ann.category_id,
            file.display()
        );
        return None;
    };
    let bbox = BBoxXYWH::new(
        ann.bbox[0] as i32,
        ann.bbox[1] as i32,
        ann.bbox[2] as i32,
        ann.bbox[3] as i32,
    );
    Some(Detection::new(bbox, class_name.clone()).with_class_id(ann.category_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sample_coco_json() -> serde_json::Value {
        serde_json::json!({
            "categories": [
                {"id": 1, "name": "dog"},
                {"id": 2, "name": "cat"}
            ],
            "images": [
                {"id": 10, "file_name": "a.jpg", "width": 490, "height": 275},
                {"id": 11, "file_name": "b.jpg", "width": 490, "height": 275},
                {"id": 12, "file_name": "skipped.bmp", "width": 10, "height": 10}
            ],
            "annotations": [
                {"id": 1, "image_id": 10, "category_id": 1, "bbox": [45.0, 2.0, 85.0, 85.0]},
                {"id": 2, "image_id": 10, "category_id": 2, "bbox": [1.5, 2.5, 3.5, 4.5]},
                {"id": 3, "image_id": 10, "category_id": 99, "bbox": [1.0, 1.0, 1.0, 1.0]},
                {"id": 4, "image_id": 10, "category_id": 1, "bbox": []},
                {"id": 5, "image_id": 777, "category_id": 1, "bbox": [1.0, 1.0, 1.0, 1.0]}
            ]
        })
    }

    #[test]
    fn reads_directory_with_unannotated_images() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let json_path = temp.path().join("annotations.json");
        fs::write(&json_path, sample_coco_json().to_string()).expect("write json");

        let dataset = read_coco_directory(temp.path(), &json_path).expect("read");

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.annotations.len(), 2);
        assert_eq!(dataset.classes, vec!["cat", "dog"]);

        // empty bbox, unknown category, and unknown image are all dropped
        let anns = &dataset.annotations["a.jpg"];
        assert_eq!(anns.len(), 2);
        match &anns[0] {
            Annotation::Detection(d) => {
                assert_eq!(d.bbox, BBoxXYWH::new(45, 2, 85, 85));
                assert_eq!(d.class_id, Some(1));
                assert_eq!(d.class_name, "dog");
            }
            other => panic!("expected detection, got {other:?}"),
        }

        assert!(dataset.annotations["b.jpg"].is_empty());
        assert_eq!(dataset.reference_sizes.get("a.jpg"), Some(&(490, 275)));
    }

    #[test]
    fn float_bbox_truncates() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let json_path = temp.path().join("annotations.json");
        fs::write(&json_path, sample_coco_json().to_string()).expect("write json");

        let dataset = read_coco_directory(temp.path(), &json_path).expect("read");
        match &dataset.annotations["a.jpg"][1] {
            Annotation::Detection(d) => assert_eq!(d.bbox, BBoxXYWH::new(1, 2, 3, 4)),
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[test]
    fn single_image_lookup_returns_size_and_detections() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let json_path = temp.path().join("annotations.json");
        fs::write(&json_path, sample_coco_json().to_string()).expect("write json");

        let (detections, size) =
            read_annotations_for_image("a.jpg", &json_path).expect("read single");
        assert_eq!(detections.len(), 2);
        assert_eq!(size, Some((490, 275)));

        let (missing, size) =
            read_annotations_for_image("nope.jpg", &json_path).expect("read single");
        assert!(missing.is_empty());
        assert_eq!(size, None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let json_path = temp.path().join("annotations.json");
        fs::write(&json_path, b"not json").expect("write");

        let err = read_coco_directory(temp.path(), &json_path).unwrap_err();
        assert!(matches!(err, LabelforgeError::CocoJsonParse { .. }));
    }
}
