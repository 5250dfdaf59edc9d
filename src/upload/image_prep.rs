//! Image preparation for upload: decode, fit under the platform size cap,
//! re-encode.
//!
//! Only JPEG and PNG are accepted. Oversized images shrink to fit inside
//! the cap preserving aspect ratio, and the caller re-projects annotation
//! coordinates through the recorded size change.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{imageops::FilterType, GenericImageView, ImageFormat};

use crate::error::LabelforgeError;

/// Largest width/height the platform accepts without shrinking.
pub const DEFAULT_MAX_UPLOAD_SIZE: (u32, u32) = (1024, 1024);

/// An image decoded, capped, and re-encoded for transfer.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    /// Encoded bytes to transfer, in the source format.
    pub bytes: Vec<u8>,
    /// Final (possibly shrunk) pixel size.
    pub width: u32,
    pub height: u32,
    /// Decoded size before any shrinking.
    pub original_size: (u32, u32),
    /// MIME type for the transfer and the remote record.
    pub content_type: &'static str,
}

impl PreparedImage {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Encoded payload length for the remote record.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn was_resized(&self) -> bool {
        self.size() != self.original_size
    }
}

/// Decode `path`, shrink it under `max_size` if needed, and re-encode it in
/// its original format.
///
/// An encoding outside the accepted set fails with an unsupported-format
/// error; this is fatal for the item and never retried.
pub fn prepare_image(path: &Path, max_size: (u32, u32)) -> Result<PreparedImage, LabelforgeError> {
    let source_bytes = fs::read(path)?;

    let format = image::guess_format(&source_bytes).map_err(|_| {
        LabelforgeError::UnsupportedImageFormat {
            path: path.to_path_buf(),
            format: "unknown".to_string(),
        }
    })?;
    let content_type = match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        other => {
            return Err(LabelforgeError::UnsupportedImageFormat {
                path: path.to_path_buf(),
                format: format!("{other:?}").to_uppercase(),
            });
        }
    };

    let decoded = image::load_from_memory_with_format(&source_bytes, format).map_err(|source| {
        LabelforgeError::ImageDecode {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let original_size = decoded.dimensions();

    let image = if original_size.0 > max_size.0 || original_size.1 > max_size.1 {
        decoded.resize(max_size.0, max_size.1, FilterType::Lanczos3)
    } else {
        decoded
    };
    let (width, height) = image.dimensions();

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, format)
        .map_err(|source| LabelforgeError::ImageEncode {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(PreparedImage {
        bytes: bytes.into_inner(),
        width,
        height,
        original_size,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn write_image(path: &Path, width: u32, height: u32, format: ImageFormat) {
        let img = image::DynamicImage::ImageRgb8(RgbImage::new(width, height));
        img.save_with_format(path, format).expect("save image");
    }

    #[test]
    fn small_image_keeps_its_size() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("small.png");
        write_image(&path, 200, 100, ImageFormat::Png);

        let prepared = prepare_image(&path, DEFAULT_MAX_UPLOAD_SIZE).expect("prepare");
        assert_eq!(prepared.size(), (200, 100));
        assert_eq!(prepared.original_size, (200, 100));
        assert!(!prepared.was_resized());
        assert_eq!(prepared.content_type, "image/png");
        assert!(prepared.byte_len() > 0);
    }

    #[test]
    fn oversized_image_shrinks_preserving_aspect() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("large.jpg");
        write_image(&path, 2048, 1024, ImageFormat::Jpeg);

        let prepared = prepare_image(&path, DEFAULT_MAX_UPLOAD_SIZE).expect("prepare");
        assert_eq!(prepared.size(), (1024, 512));
        assert_eq!(prepared.original_size, (2048, 1024));
        assert!(prepared.was_resized());
        assert_eq!(prepared.content_type, "image/jpeg");
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("image.bmp");
        // BMP magic followed by padding; enough for format detection
        let mut bytes = b"BM".to_vec();
        bytes.resize(64, 0);
        fs::write(&path, bytes).expect("write bmp");

        let err = prepare_image(&path, DEFAULT_MAX_UPLOAD_SIZE).unwrap_err();
        assert!(matches!(
            err,
            LabelforgeError::UnsupportedImageFormat { .. }
        ));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("noise.jpg");
        fs::write(&path, b"definitely not an image").expect("write");

        let err = prepare_image(&path, DEFAULT_MAX_UPLOAD_SIZE).unwrap_err();
        assert!(matches!(
            err,
            LabelforgeError::UnsupportedImageFormat { .. }
        ));
    }
}
