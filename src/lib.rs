//! Labelforge: Rust SDK for the Labelforge annotation platform.
//!
//! The SDK manages projects on the platform: fetch project metadata, and
//! bulk-upload images together with their annotations read from any of the
//! common interchange layouts (Pascal VOC, COCO, YOLO, or a plain
//! folder-per-class tree). All formats normalize into one canonical box
//! representation before upload, images are shrunk under the platform size
//! cap with annotations re-projected to match, and a bounded worker pool
//! streams one result per image with per-item failure tolerance.
//!
//! # Modules
//!
//! - [`client`]: HTTP transport with typed API errors and bounded retries
//! - [`api`]: typed platform endpoints behind the [`PlatformApi`] seam
//! - [`dataset`]: format readers and the canonical dataset index
//! - [`upload`]: image preparation and the per-item upload machinery
//! - [`project`]: the [`Project`] handle tying it all together
//!
//! # Example
//!
//! ```no_run
//! use labelforge::{BoxFormat, Client, UploadDatasetOptions};
//!
//! # fn main() -> Result<(), labelforge::LabelforgeError> {
//! let client = Client::new("api-key");
//! let project = client.project("project-id")?;
//!
//! let options = UploadDatasetOptions {
//!     box_format: BoxFormat::PascalVoc,
//!     ..Default::default()
//! };
//! for outcome in project.upload_dataset("datasets/traffic", options)? {
//!     match outcome.result {
//!         Ok(record) => println!("uploaded {} as {}", outcome.image_path.display(), record.record_id),
//!         Err(err) => eprintln!("failed {}: {err}", outcome.image_path.display()),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod dataset;
pub mod error;
pub mod project;
pub mod upload;

pub use api::{PlatformApi, ProjectInfo, ProjectType};
pub use client::Client;
pub use dataset::{
    Annotation, BBoxXYWH, BoxFormat, Classification, Dataset, DatasetEntry, Detection,
};
pub use error::{ApiError, LabelforgeError};
pub use project::{Project, UploadDatasetOptions, UploadOptions, UploadResults};
pub use upload::{LabelMap, UploadOutcome, UploadRecord, Uploader};
