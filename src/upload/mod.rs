//! Per-item upload machinery.
//!
//! [`Uploader`] performs one image's full upload synchronously: prepare the
//! image under the size cap, obtain a pre-signed destination, transfer the
//! bytes, register the dataset record, then register the annotations with
//! boxes re-projected into the uploaded frame. The worker pool in
//! [`pool`] fans this out over a dataset with bounded parallelism.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use log::warn;

use crate::api::{
    AnnotationCategory, AnnotationsPayload, PlatformApi, RecordPayload, WireAnnotation,
    WireImageSize, WireMetadata, WireShape,
};
use crate::dataset::{Annotation, DatasetEntry};
use crate::error::LabelforgeError;

pub mod image_prep;
pub mod pool;

pub use image_prep::{prepare_image, PreparedImage, DEFAULT_MAX_UPLOAD_SIZE};

/// Class name to remote label id, resolved once per run and shared
/// read-only across workers.
pub type LabelMap = HashMap<String, String>;

/// Result of uploading one image.
#[derive(Clone, Debug)]
pub struct UploadRecord {
    /// Remote id of the created dataset record.
    pub record_id: String,
    /// The label map the annotations were resolved through.
    pub labels: Arc<LabelMap>,
    /// Remote ids of the created annotations, in submission order.
    pub annotation_ids: Vec<String>,
}

/// One result from an upload run: the item's path plus its success payload
/// or recorded failure.
#[derive(Debug)]
pub struct UploadOutcome {
    pub image_path: PathBuf,
    pub result: Result<UploadRecord, LabelforgeError>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Uploads images and annotations into one project.
#[derive(Clone)]
pub struct Uploader {
    api: Arc<dyn PlatformApi>,
    project_id: String,
}

impl Uploader {
    pub fn new(api: Arc<dyn PlatformApi>, project_id: impl Into<String>) -> Self {
        Self {
            api,
            project_id: project_id.into(),
        }
    }

    /// Create a grouping batch for this run.
    pub fn create_batch(&self, batch_name: &str) -> Result<String, LabelforgeError> {
        self.api.create_batch(&self.project_id, batch_name)
    }

    /// Create (or re-use, server-side) labels for the given class names and
    /// return the name to id map.
    pub fn create_labels(&self, names: &[String]) -> Result<LabelMap, LabelforgeError> {
        if names.is_empty() {
            return Ok(LabelMap::new());
        }
        self.api.create_labels(&self.project_id, names)
    }

    /// Upload one dataset entry: image bytes first, then its annotations.
    ///
    /// When `labels` is `None` the labels for this entry's class names are
    /// created on demand; a class missing from a supplied map fails this
    /// entry only.
    pub fn upload_entry(
        &self,
        batch_id: &str,
        entry: &DatasetEntry,
        labels: Option<&Arc<LabelMap>>,
    ) -> Result<UploadRecord, LabelforgeError> {
        let prepared = prepare_image(&entry.image_path, DEFAULT_MAX_UPLOAD_SIZE)?;
        let record = self.upload_image(batch_id, entry, &prepared)?;

        if entry.annotations.is_empty() {
            return Ok(UploadRecord {
                record_id: record,
                labels: labels.map(Arc::clone).unwrap_or_default(),
                annotation_ids: Vec::new(),
            });
        }

        let labels = match labels {
            Some(labels) => Arc::clone(labels),
            None => Arc::new(self.create_labels(&distinct_class_names(&entry.annotations))?),
        };

        let annotations = build_wire_annotations(
            &entry.annotations,
            entry.reference_size,
            (prepared.width, prepared.height),
            &labels,
        )?;
        let created = self.api.create_annotations(
            &self.project_id,
            &AnnotationsPayload {
                dataset_record_id: record.clone(),
                annotations,
            },
        )?;

        Ok(UploadRecord {
            record_id: record,
            labels,
            annotation_ids: created.into_iter().map(|ann| ann.id).collect(),
        })
    }

    /// Transfer the prepared bytes and register the dataset record.
    fn upload_image(
        &self,
        batch_id: &str,
        entry: &DatasetEntry,
        prepared: &PreparedImage,
    ) -> Result<String, LabelforgeError> {
        let file_name = entry
            .image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("image")
            .to_string();

        let presigned =
            self.api
                .presign_upload(&self.project_id, &file_name, prepared.content_type)?;
        self.api
            .put_object(&presigned.upload_url, prepared.content_type, &prepared.bytes)?;

        let record = self.api.create_record(
            &self.project_id,
            &RecordPayload {
                name: file_name,
                batch_id: batch_id.to_string(),
                height: prepared.height,
                width: prepared.width,
                content_type: prepared.content_type.to_string(),
                size: prepared.byte_len(),
                source: presigned.uri,
            },
        )?;
        Ok(record.id)
    }
}

/// Sorted distinct class names across a list of annotations.
pub(crate) fn distinct_class_names(annotations: &[Annotation]) -> Vec<String> {
    let mut names: Vec<String> = annotations
        .iter()
        .map(|ann| ann.class_name().to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Translate annotations into the wire schema against the uploaded image
/// size.
///
/// Detection boxes are re-projected from `reference_size` into
/// `uploaded_size`; with no reference frame they are submitted as parsed.
fn build_wire_annotations(
    annotations: &[Annotation],
    reference_size: Option<(u32, u32)>,
    uploaded_size: (u32, u32),
    labels: &LabelMap,
) -> Result<Vec<WireAnnotation>, LabelforgeError> {
    let metadata = || WireMetadata {
        image: WireImageSize {
            width: uploaded_size.0,
            height: uploaded_size.1,
        },
    };

    let mut wire = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let label_id = labels
            .get(annotation.class_name())
            .cloned()
            .ok_or_else(|| LabelforgeError::MissingLabel {
                class_name: annotation.class_name().to_string(),
            })?;

        let shape = match annotation {
            Annotation::Classification(_) => WireShape {
                category: AnnotationCategory::Category,
                left: None,
                top: None,
                width: None,
                height: None,
                metadata: metadata(),
            },
            Annotation::Detection(detection) => {
                let bbox = match reference_size {
                    Some(reference) => detection.bbox.rescale(reference, uploaded_size),
                    None => detection.bbox,
                };
                WireShape {
                    category: AnnotationCategory::BoundingBox,
                    left: Some(bbox.left),
                    top: Some(bbox.top),
                    width: Some(bbox.width),
                    height: Some(bbox.height),
                    metadata: metadata(),
                }
            }
        };

        wire.push(WireAnnotation {
            annotation: shape,
            label_id,
        });
    }
    Ok(wire)
}

/// Log and record a failed item without touching its siblings.
pub(crate) fn outcome_for(
    image_path: PathBuf,
    result: Result<UploadRecord, LabelforgeError>,
) -> UploadOutcome {
    if let Err(err) = &result {
        warn!(
            "Error occurred while uploading file {}: {}",
            image_path.display(),
            err
        );
    }
    UploadOutcome { image_path, result }
}
