//! In-memory dataset index shared by all format readers.
//!
//! A reader walks a directory layout once and produces a [`Dataset`]: the
//! class vocabulary, an image-id to path map, and per-image annotation
//! lists. The upload pipeline only ever consumes the uniform
//! [`DatasetEntry`] iteration, so the source format is invisible past this
//! point.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::bbox::BBoxXYWH;

/// A classification annotation: one class name, no geometry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub class_name: String,
}

impl Classification {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }
}

/// An object detection annotation: a canonical box plus its class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detection {
    pub bbox: BBoxXYWH,
    pub class_name: String,
    pub class_id: Option<i64>,
}

impl Detection {
    pub fn new(bbox: BBoxXYWH, class_name: impl Into<String>) -> Self {
        Self {
            bbox,
            class_name: class_name.into(),
            class_id: None,
        }
    }

    pub fn with_class_id(mut self, class_id: i64) -> Self {
        self.class_id = Some(class_id);
        self
    }
}

/// One annotation attached to an image.
///
/// The two variants are a real sum type so the payload builder can match
/// exhaustively instead of inspecting shapes at runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    Classification(Classification),
    Detection(Detection),
}

impl Annotation {
    /// The class name carried by either variant.
    pub fn class_name(&self) -> &str {
        match self {
            Annotation::Classification(c) => &c.class_name,
            Annotation::Detection(d) => &d.class_name,
        }
    }
}

/// One unit of upload work: an image and everything known about it.
#[derive(Clone, Debug)]
pub struct DatasetEntry {
    /// Absolute path to the image file.
    pub image_path: PathBuf,
    /// Annotations for the image; empty when none were found.
    pub annotations: Vec<Annotation>,
    /// The image size the annotation coordinates are relative to, when the
    /// source format declared or measured one. `None` means no rescale
    /// reference exists and boxes are submitted as parsed.
    pub reference_size: Option<(u32, u32)>,
}

/// A dataset index built from one directory scan.
///
/// Image ids are file names. Built once by a format reader and read-only
/// afterward; `BTreeMap` keeps iteration deterministic.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Ordered set of distinct class names for the whole dataset.
    pub classes: Vec<String>,
    /// Image id to absolute image path.
    pub images: BTreeMap<String, PathBuf>,
    /// Image id to annotation list. Keys without a matching image are
    /// unreachable by iteration and dropped silently.
    pub annotations: BTreeMap<String, Vec<Annotation>>,
    /// Image id to the declared or measured size its boxes refer to.
    pub reference_sizes: BTreeMap<String, (u32, u32)>,
}

impl Dataset {
    /// Number of images in the dataset.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Iterates the dataset, yielding one owned [`DatasetEntry`] per image.
    ///
    /// Images with no recorded annotations yield an empty list.
    pub fn entries(&self) -> impl Iterator<Item = DatasetEntry> + '_ {
        self.images.iter().map(|(image_id, image_path)| DatasetEntry {
            image_path: image_path.clone(),
            annotations: self.annotations.get(image_id).cloned().unwrap_or_default(),
            reference_size: self.reference_sizes.get(image_id).copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        let mut images = BTreeMap::new();
        images.insert("a.jpg".to_string(), PathBuf::from("/data/a.jpg"));
        images.insert("b.jpg".to_string(), PathBuf::from("/data/b.jpg"));

        let mut annotations = BTreeMap::new();
        annotations.insert(
            "a.jpg".to_string(),
            vec![Annotation::Classification(Classification::new("cat"))],
        );
        // annotation-only entry with no matching image
        annotations.insert(
            "ghost.jpg".to_string(),
            vec![Annotation::Classification(Classification::new("dog"))],
        );

        Dataset {
            classes: vec!["cat".into(), "dog".into()],
            images,
            annotations,
            reference_sizes: BTreeMap::new(),
        }
    }

    #[test]
    fn len_counts_images_not_annotations() {
        let dataset = sample_dataset();
        assert_eq!(dataset.len(), 2);
    }

    #[test]
    fn entries_yield_one_item_per_image() {
        let dataset = sample_dataset();
        let entries: Vec<_> = dataset.entries().collect();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].image_path, PathBuf::from("/data/a.jpg"));
        assert_eq!(entries[0].annotations.len(), 1);

        // image without annotations gets an empty list
        assert!(entries[1].annotations.is_empty());
    }

    #[test]
    fn annotation_only_entries_are_unreachable() {
        let dataset = sample_dataset();
        assert!(dataset
            .entries()
            .all(|e| !e.image_path.ends_with("ghost.jpg")));
    }

    #[test]
    fn class_name_is_uniform_across_variants() {
        let c = Annotation::Classification(Classification::new("cat"));
        let d = Annotation::Detection(Detection::new(BBoxXYWH::new(0, 0, 1, 1), "dog"));
        assert_eq!(c.class_name(), "cat");
        assert_eq!(d.class_name(), "dog");
    }
}
