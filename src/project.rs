//! Project handle: metadata plus single-image and whole-dataset uploads.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;

use crate::api::{PlatformApi, ProjectInfo, ProjectType};
use crate::client::Client;
use crate::dataset::{
    io_coco_json, io_voc_xml, io_yolo, Annotation, BoxFormat, Classification, Dataset,
    DatasetEntry,
};
use crate::error::LabelforgeError;
use crate::upload::pool::WorkerPool;
use crate::upload::{outcome_for, LabelMap, UploadOutcome, UploadRecord, Uploader};

const DEFAULT_BATCH_NAME: &str = "sdk-upload";

/// Options for a single-image upload.
#[derive(Clone, Debug)]
pub struct UploadOptions {
    /// Annotation file for the image; for classification projects this is
    /// the class name itself.
    pub annotation_path: Option<PathBuf>,
    /// Batch name used when no `batch_id` is pinned.
    pub batch_name: String,
    /// Encoding of the annotation file for detection projects.
    pub box_format: BoxFormat,
    /// Re-use an existing batch instead of creating one.
    pub batch_id: Option<String>,
    /// Pre-resolved label map; trusted as-is.
    pub labels_map: Option<LabelMap>,
    /// YOLO class index to name mapping for YOLO annotation files.
    pub yolo_labels_map: Option<BTreeMap<i64, String>>,
    /// Classification only: label the image after its parent directory.
    pub use_folder_as_class_name: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            annotation_path: None,
            batch_name: DEFAULT_BATCH_NAME.to_string(),
            box_format: BoxFormat::default(),
            batch_id: None,
            labels_map: None,
            yolo_labels_map: None,
            use_folder_as_class_name: false,
        }
    }
}

/// Options for a whole-dataset upload.
#[derive(Clone, Debug)]
pub struct UploadDatasetOptions {
    pub batch_name: String,
    /// Annotation encoding; only consulted for object detection projects.
    pub box_format: BoxFormat,
    /// Worker threads draining the dataset.
    pub num_workers: usize,
    /// Re-use an existing batch instead of creating one.
    pub batch_id: Option<String>,
    /// Pre-resolved label map; trusted as-is, missing classes fail per item.
    pub labels_map: Option<LabelMap>,
    /// Directory under the dataset root holding VOC/YOLO annotation files.
    pub annotation_dir_name: String,
    /// YOLO class config file name under the dataset root.
    pub config_file: String,
    /// COCO annotation file name under the dataset root.
    pub annotations_file: String,
}

impl Default for UploadDatasetOptions {
    fn default() -> Self {
        Self {
            batch_name: DEFAULT_BATCH_NAME.to_string(),
            box_format: BoxFormat::default(),
            num_workers: 4,
            batch_id: None,
            labels_map: None,
            annotation_dir_name: "labels".to_string(),
            config_file: "data.yaml".to_string(),
            annotations_file: "annotations.json".to_string(),
        }
    }
}

/// A project on the Labelforge platform.
pub struct Project {
    api: Arc<dyn PlatformApi>,
    uploader: Uploader,
    pub project_id: String,
    pub name: String,
    pub workspace_id: String,
    pub project_type: ProjectType,
}

impl Client {
    /// Fetch project metadata and return a handle for uploading into it.
    pub fn project(&self, project_id: impl Into<String>) -> Result<Project, LabelforgeError> {
        Project::connect(Arc::new(self.clone()), project_id)
    }
}

impl Project {
    /// Build a project handle over any [`PlatformApi`] implementation,
    /// fetching its metadata up front.
    pub fn connect(
        api: Arc<dyn PlatformApi>,
        project_id: impl Into<String>,
    ) -> Result<Project, LabelforgeError> {
        let project_id = project_id.into();
        let info: ProjectInfo = api.get_project(&project_id)?;
        let uploader = Uploader::new(Arc::clone(&api), project_id.clone());
        Ok(Project {
            api,
            uploader,
            project_id,
            name: info.name,
            workspace_id: info.workspace_id,
            project_type: info.project_type,
        })
    }

    pub fn is_classification(&self) -> bool {
        self.project_type == ProjectType::Classification
    }

    pub fn is_object_detection(&self) -> bool {
        self.project_type == ProjectType::ObjectDetection
    }

    /// Fetch fresh metadata for this project.
    pub fn get(&self) -> Result<ProjectInfo, LabelforgeError> {
        self.api.get_project(&self.project_id)
    }

    /// Upload one image, with or without annotations.
    pub fn upload(
        &self,
        image_path: impl AsRef<Path>,
        options: UploadOptions,
    ) -> Result<UploadRecord, LabelforgeError> {
        let image_path = image_path.as_ref();
        if !image_path.exists() {
            return Err(LabelforgeError::PathNotFound {
                path: image_path.to_path_buf(),
            });
        }

        let batch_id = match &options.batch_id {
            Some(batch_id) => batch_id.clone(),
            None => self.uploader.create_batch(&options.batch_name)?,
        };

        let entry = self.read_single_entry(image_path, &options)?;
        let labels = options.labels_map.map(Arc::new);
        self.uploader.upload_entry(&batch_id, &entry, labels.as_ref())
    }

    /// Upload every image in a dataset directory.
    ///
    /// Returns a stream of one [`UploadOutcome`] per image, in completion
    /// order. Failures are per item; inspect each outcome rather than
    /// relying on the absence of an error.
    pub fn upload_dataset(
        &self,
        data_dir: impl AsRef<Path>,
        options: UploadDatasetOptions,
    ) -> Result<UploadResults, LabelforgeError> {
        let data_dir = data_dir.as_ref();
        if !data_dir.is_dir() {
            return Err(LabelforgeError::PathNotFound {
                path: data_dir.to_path_buf(),
            });
        }

        let dataset = self.read_dataset_directory(data_dir, &options)?;
        if dataset.is_empty() {
            return Err(LabelforgeError::EmptyDataset {
                path: data_dir.to_path_buf(),
            });
        }

        let batch_id = match &options.batch_id {
            Some(batch_id) => batch_id.clone(),
            None => self.uploader.create_batch(&options.batch_name)?,
        };

        // resolved once, read-only for the rest of the run
        let labels = Arc::new(match options.labels_map {
            Some(labels) => labels,
            None => self.uploader.create_labels(&dataset.classes)?,
        });

        let entries: Vec<DatasetEntry> = dataset.entries().collect();
        let progress = create_progress_bar(entries.len() as u64);

        let uploader = self.uploader.clone();
        let pool = WorkerPool::run(entries, options.num_workers, move |entry| {
            let result = uploader.upload_entry(&batch_id, &entry, Some(&labels));
            outcome_for(entry.image_path, result)
        });

        Ok(UploadResults { pool, progress })
    }

    /// Build the dataset index for this project type and format.
    fn read_dataset_directory(
        &self,
        data_dir: &Path,
        options: &UploadDatasetOptions,
    ) -> Result<Dataset, LabelforgeError> {
        if self.is_classification() {
            return Dataset::from_image_folder(data_dir);
        }
        let annotations_path = match options.box_format {
            BoxFormat::Coco => data_dir.join(&options.annotations_file),
            _ => data_dir.join(&options.annotation_dir_name),
        };
        Dataset::from_format(
            options.box_format,
            data_dir,
            annotations_path,
            data_dir.join(&options.config_file),
        )
    }

    /// Read the annotations for a single-image upload.
    fn read_single_entry(
        &self,
        image_path: &Path,
        options: &UploadOptions,
    ) -> Result<DatasetEntry, LabelforgeError> {
        if self.is_classification() {
            let class_name = if options.use_folder_as_class_name {
                image_path
                    .parent()
                    .and_then(|parent| parent.file_name())
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
            } else {
                options
                    .annotation_path
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned())
            };

            return Ok(DatasetEntry {
                image_path: image_path.to_path_buf(),
                annotations: class_name
                    .map(|name| vec![Annotation::Classification(Classification::new(name))])
                    .unwrap_or_default(),
                reference_size: None,
            });
        }

        let Some(annotation_path) = options.annotation_path.as_deref() else {
            return Ok(DatasetEntry {
                image_path: image_path.to_path_buf(),
                annotations: Vec::new(),
                reference_size: None,
            });
        };
        if !annotation_path.exists() {
            warn!("No annotations file found: {}", annotation_path.display());
            return Ok(DatasetEntry {
                image_path: image_path.to_path_buf(),
                annotations: Vec::new(),
                reference_size: None,
            });
        }

        let (detections, reference_size) = match options.box_format {
            BoxFormat::PascalVoc => {
                let parsed = io_voc_xml::read_annotation_file(annotation_path)?;
                (parsed.detections, parsed.size)
            }
            BoxFormat::Coco => {
                let image_name = image_path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default();
                io_coco_json::read_annotations_for_image(image_name, annotation_path)?
            }
            BoxFormat::Yolo => {
                let size = imagesize::size(image_path)
                    .map(|size| (size.width as u32, size.height as u32))
                    .ok();
                let empty = BTreeMap::new();
                let labels_map = options.yolo_labels_map.as_ref().unwrap_or(&empty);
                match size {
                    Some(size) => (
                        io_yolo::read_annotation_file(annotation_path, size, labels_map)?,
                        Some(size),
                    ),
                    None => {
                        warn!(
                            "Could not measure image size for {}",
                            image_path.display()
                        );
                        (Vec::new(), None)
                    }
                }
            }
        };

        if detections.is_empty() {
            warn!(
                "No annotations available for {} in file: {}",
                image_path.display(),
                annotation_path.display()
            );
        }

        Ok(DatasetEntry {
            image_path: image_path.to_path_buf(),
            annotations: detections.into_iter().map(Annotation::Detection).collect(),
            reference_size,
        })
    }
}

/// Streaming results of a dataset upload, driving a progress bar as items
/// complete.
pub struct UploadResults {
    pool: WorkerPool<UploadOutcome>,
    progress: ProgressBar,
}

impl Iterator for UploadResults {
    type Item = UploadOutcome;

    fn next(&mut self) -> Option<UploadOutcome> {
        match self.pool.next() {
            Some(outcome) => {
                self.progress.inc(1);
                Some(outcome)
            }
            None => {
                self.progress.finish();
                None
            }
        }
    }
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [Uploading dataset] [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    ) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}
