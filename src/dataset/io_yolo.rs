//! Ultralytics-style YOLO reader.
//!
//! One `.txt` file per image with `class_index cx cy w h` lines in
//! normalized coordinates, plus a `data.yaml` config whose `names` key maps
//! class indices to names (list form: positional; mapping form: explicit
//! keys). Boxes are denormalized against the measured size of the image
//! file they belong to.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

use super::bbox::BBoxXYWH;
use super::model::{Annotation, Dataset, Detection};
use crate::error::LabelforgeError;

const LABEL_EXTENSION: &str = "txt";

#[derive(Debug, Deserialize)]
struct YoloConfig {
    #[serde(default)]
    names: Option<YoloNames>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YoloNames {
    List(Vec<String>),
    Map(BTreeMap<i64, String>),
}

/// Read the index-to-name mapping out of a `data.yaml`-style config.
///
/// A missing file degrades to an empty mapping with a warning; annotations
/// then fall back to index strings as class names. A present but
/// unparseable file is an error.
pub fn read_config(path: &Path) -> Result<BTreeMap<i64, String>, LabelforgeError> {
    if !path.is_file() {
        warn!("Could not find config file: {}", path.display());
        return Ok(BTreeMap::new());
    }
    let text = fs::read_to_string(path)?;
    let config: YoloConfig =
        serde_yaml::from_str(&text).map_err(|source| LabelforgeError::YoloConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(match config.names {
        Some(YoloNames::List(names)) => names
            .into_iter()
            .enumerate()
            .map(|(index, name)| (index as i64, name))
            .collect(),
        Some(YoloNames::Map(map)) => map,
        None => BTreeMap::new(),
    })
}

/// Parse one YOLO label file against the image size its coordinates are
/// normalized to.
///
/// Lines with fewer than five whitespace-separated fields are skipped, as
/// are lines with non-numeric fields. An index absent from `labels_map`
/// uses its decimal form as the class name.
pub fn read_annotation_file(
    path: &Path,
    image_size: (u32, u32),
    labels_map: &BTreeMap<i64, String>,
) -> Result<Vec<Detection>, LabelforgeError> {
    let content = fs::read_to_string(path)?;

    let mut detections = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            continue;
        }

        let class_index = fields[0].parse::<i64>();
        let coords: Result<Vec<f64>, _> =
            fields[1..5].iter().map(|field| field.parse::<f64>()).collect();
        let (Ok(class_index), Ok(coords)) = (class_index, coords) else {
            warn!(
                "Skipping non-numeric label line {} in {}",
                line_idx + 1,
                path.display()
            );
            continue;
        };

        let class_name = labels_map
            .get(&class_index)
            .cloned()
            .unwrap_or_else(|| class_index.to_string());
        let bbox =
            BBoxXYWH::from_center_normalized(coords[0], coords[1], coords[2], coords[3], image_size);
        detections.push(Detection::new(bbox, class_name).with_class_id(class_index));
    }

    Ok(detections)
}

/// Read a YOLO dataset from an image tree, a parallel label directory, and
/// a class config file.
pub fn read_yolo_directory(
    images_dir: &Path,
    labels_dir: &Path,
    config_file: &Path,
) -> Result<Dataset, LabelforgeError> {
    let labels_map = read_config(config_file)?;
    let images = super::collect_image_files(images_dir);

    let mut annotations = BTreeMap::new();
    let mut reference_sizes = BTreeMap::new();
    let mut class_names: BTreeSet<String> = labels_map.values().cloned().collect();

    for (image_id, image_path) in &images {
        let image_size = match imagesize::size(image_path) {
            Ok(size) => (size.width as u32, size.height as u32),
            Err(err) => {
                warn!(
                    "Could not measure image size for {}: {}",
                    image_path.display(),
                    err
                );
                annotations.insert(image_id.clone(), Vec::new());
                continue;
            }
        };
        reference_sizes.insert(image_id.clone(), image_size);

        let label_path = labels_dir
            .join(image_path.file_stem().unwrap_or_default())
            .with_extension(LABEL_EXTENSION);
        let detections = if label_path.is_file() {
            read_annotation_file(&label_path, image_size, &labels_map)?
        } else {
            warn!("No annotations file found: {}", label_path.display());
            Vec::new()
        };

        for detection in &detections {
            class_names.insert(detection.class_name.clone());
        }
        annotations.insert(
            image_id.clone(),
            detections.into_iter().map(Annotation::Detection).collect(),
        );
    }

    Ok(Dataset {
        classes: class_names.into_iter().collect(),
        images,
        annotations,
        reference_sizes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn config_list_form_is_positional() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("data.yaml");
        fs::write(&path, "train: images/train\nnames:\n  - car\n  - person\n").expect("write");

        let map = read_config(&path).expect("read config");
        assert_eq!(map.get(&0), Some(&"car".to_string()));
        assert_eq!(map.get(&1), Some(&"person".to_string()));
    }

    #[test]
    fn config_mapping_form_uses_explicit_keys() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("data.yaml");
        fs::write(&path, "names:\n  3: car\n  7: person\n").expect("write");

        let map = read_config(&path).expect("read config");
        assert_eq!(map.get(&3), Some(&"car".to_string()));
        assert_eq!(map.get(&7), Some(&"person".to_string()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn missing_config_degrades_to_empty_map() {
        let map = read_config(Path::new("/nonexistent/data.yaml")).expect("read config");
        assert!(map.is_empty());
    }

    #[test]
    fn short_lines_are_skipped() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "0 0.5 0.5\n1 0.5 0.5 0.2 0.2\n").expect("write");

        let detections =
            read_annotation_file(&path, (100, 100), &BTreeMap::new()).expect("read labels");
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, Some(1));
    }

    #[test]
    fn unmapped_index_becomes_string_class_name() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "5 0.5 0.5 0.2 0.2\n").expect("write");

        let detections =
            read_annotation_file(&path, (100, 100), &BTreeMap::new()).expect("read labels");
        assert_eq!(detections[0].class_name, "5");
    }

    #[test]
    fn boxes_denormalize_against_image_size() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("a.txt");
        fs::write(&path, "0 0.5 0.5 0.5 0.5\n").expect("write");

        let mut labels_map = BTreeMap::new();
        labels_map.insert(0, "car".to_string());

        let detections = read_annotation_file(&path, (200, 100), &labels_map).expect("read");
        assert_eq!(detections[0].bbox, BBoxXYWH::new(50, 25, 100, 50));
        assert_eq!(detections[0].class_name, "car");
    }
}
