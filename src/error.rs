use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labelforge operations.
#[derive(Debug, Error)]
pub enum LabelforgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provided path does not exist at {path}")]
    PathNotFound { path: PathBuf },

    #[error("Could not read any images or annotations in {path}")]
    EmptyDataset { path: PathBuf },

    #[error("Image format {format} not supported (accepted: JPEG, PNG) for {path}")]
    UnsupportedImageFormat { path: PathBuf, format: String },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to encode image {path}: {source}")]
    ImageEncode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to parse VOC XML from {path}: {message}")]
    VocXmlParse { path: PathBuf, message: String },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse YOLO config from {path}: {source}")]
    YoloConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("No label id mapped for class '{class_name}'")]
    MissingLabel { class_name: String },

    #[error("Unexpected response from {path}: {source}")]
    UnexpectedResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP transport error: {source}")]
    Transport {
        #[source]
        source: Box<ureq::Error>,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<ureq::Error> for LabelforgeError {
    fn from(source: ureq::Error) -> Self {
        LabelforgeError::Transport {
            source: Box::new(source),
        }
    }
}

/// Error returned by the Labelforge API on a non-2xx response.
///
/// Carries the status message and structured details from the response body
/// alongside the HTTP status code.
#[derive(Debug, Error)]
#[error("Error Reason: {message:?} Error Details: {details} HTTP Status Code: {status_code}")]
pub struct ApiError {
    pub message: Option<String>,
    pub details: serde_json::Value,
    pub status_code: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_carries_status_code() {
        let err = ApiError {
            message: Some("not found".into()),
            details: serde_json::Value::Array(vec![]),
            status_code: 404,
        };
        let wrapped: LabelforgeError = err.into();
        assert!(wrapped.to_string().contains("404"));
    }

    #[test]
    fn missing_label_names_the_class() {
        let err = LabelforgeError::MissingLabel {
            class_name: "giraffe".into(),
        };
        assert!(err.to_string().contains("giraffe"));
    }
}
