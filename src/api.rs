//! Typed view of the Labelforge platform endpoints.
//!
//! [`PlatformApi`] is the seam between the upload pipeline and the HTTP
//! transport: the pipeline only ever talks to this trait, the [`Client`]
//! implements it over the wire, and tests substitute an in-memory fake.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::error::LabelforgeError;

/// Kinds of projects the platform hosts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Classification,
    ObjectDetection,
}

/// Project metadata from `GET /projects/{id}/`.
#[derive(Clone, Debug, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    #[serde(rename = "projectType")]
    pub project_type: ProjectType,
}

/// Pre-signed destination for one image transfer.
#[derive(Clone, Debug, Deserialize)]
pub struct PresignedUpload {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    pub uri: String,
}

/// Body of `POST /projects/{id}/datasets/records/`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    pub name: String,
    pub batch_id: String,
    pub height: u32,
    pub width: u32,
    pub content_type: String,
    pub size: usize,
    pub source: String,
}

/// A created dataset record.
#[derive(Clone, Debug, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
struct CreatedBatch {
    id: String,
}

#[derive(Clone, Debug, Deserialize)]
struct CreatedLabel {
    id: String,
    name: String,
}

/// A created annotation, as returned by `POST /projects/{id}/annotations/`.
#[derive(Clone, Debug, Deserialize)]
pub struct CreatedAnnotation {
    pub id: String,
}

/// Wire category of an annotation shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationCategory {
    Category,
    BoundingBox,
}

/// One annotation in the submission payload.
#[derive(Clone, Debug, Serialize)]
pub struct WireAnnotation {
    pub annotation: WireShape,
    pub label_id: String,
}

/// Geometry and metadata of one submitted annotation. Classification
/// shapes carry no coordinates.
#[derive(Clone, Debug, Serialize)]
pub struct WireShape {
    pub category: AnnotationCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub metadata: WireMetadata,
}

#[derive(Clone, Debug, Serialize)]
pub struct WireMetadata {
    pub image: WireImageSize,
}

#[derive(Clone, Debug, Serialize)]
pub struct WireImageSize {
    pub width: u32,
    pub height: u32,
}

/// Body of `POST /projects/{id}/annotations/`.
#[derive(Clone, Debug, Serialize)]
pub struct AnnotationsPayload {
    pub dataset_record_id: String,
    pub annotations: Vec<WireAnnotation>,
}

/// The remote operations the upload pipeline depends on.
///
/// Implementations are shared read-mostly across upload workers, so every
/// method takes `&self` and must be safe to call concurrently.
pub trait PlatformApi: Send + Sync {
    fn get_project(&self, project_id: &str) -> Result<ProjectInfo, LabelforgeError>;

    fn create_batch(&self, project_id: &str, batch_name: &str) -> Result<String, LabelforgeError>;

    fn create_labels(
        &self,
        project_id: &str,
        names: &[String],
    ) -> Result<HashMap<String, String>, LabelforgeError>;

    fn presign_upload(
        &self,
        project_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, LabelforgeError>;

    fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), LabelforgeError>;

    fn create_record(
        &self,
        project_id: &str,
        payload: &RecordPayload,
    ) -> Result<DatasetRecord, LabelforgeError>;

    fn create_annotations(
        &self,
        project_id: &str,
        payload: &AnnotationsPayload,
    ) -> Result<Vec<CreatedAnnotation>, LabelforgeError>;
}

fn from_response<T: serde::de::DeserializeOwned>(
    path: &str,
    value: Value,
) -> Result<T, LabelforgeError> {
    serde_json::from_value(value).map_err(|source| LabelforgeError::UnexpectedResponse {
        path: path.to_string(),
        source,
    })
}

impl PlatformApi for Client {
    fn get_project(&self, project_id: &str) -> Result<ProjectInfo, LabelforgeError> {
        let path = format!("/projects/{project_id}/");
        let value = self.get(&path, &[])?;
        from_response(&path, value)
    }

    fn create_batch(&self, project_id: &str, batch_name: &str) -> Result<String, LabelforgeError> {
        let path = format!("/projects/{project_id}/batches/");
        let value = self.post(&path, &serde_json::json!({ "name": batch_name }))?;
        let batch: CreatedBatch = from_response(&path, value)?;
        Ok(batch.id)
    }

    fn create_labels(
        &self,
        project_id: &str,
        names: &[String],
    ) -> Result<HashMap<String, String>, LabelforgeError> {
        let path = format!("/projects/{project_id}/annotations/labels/");
        let payload: Vec<Value> = names
            .iter()
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let value = self.post(&path, &payload)?;
        let labels: Vec<CreatedLabel> = from_response(&path, value)?;
        Ok(labels
            .into_iter()
            .map(|label| (label.name, label.id))
            .collect())
    }

    fn presign_upload(
        &self,
        project_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<PresignedUpload, LabelforgeError> {
        let path = format!("/projects/{project_id}/upload/");
        let value = self.post(
            &path,
            &serde_json::json!({ "name": file_name, "content_type": content_type }),
        )?;
        from_response(&path, value)
    }

    fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), LabelforgeError> {
        self.put_bytes(upload_url, content_type, bytes)
    }

    fn create_record(
        &self,
        project_id: &str,
        payload: &RecordPayload,
    ) -> Result<DatasetRecord, LabelforgeError> {
        let path = format!("/projects/{project_id}/datasets/records/");
        let value = self.post(&path, payload)?;
        from_response(&path, value)
    }

    fn create_annotations(
        &self,
        project_id: &str,
        payload: &AnnotationsPayload,
    ) -> Result<Vec<CreatedAnnotation>, LabelforgeError> {
        let path = format!("/projects/{project_id}/annotations/");
        let value = self.post(&path, payload)?;
        from_response(&path, value)
    }
}
