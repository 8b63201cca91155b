use std::{io::Cursor, path::Path};

use bytes::Bytes;
use image::{
    io::{Limits, Reader},
    ImageError, ImageOutputFormat,
};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::warn;

use crate::error::AppError;

pub const PNG_EXT: &str = "png";
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Largest accepted side of an uploaded profile picture, in pixels.
pub const MAX_IMAGE_DIMENSION: u32 = 4096;
const MAX_DECODE_ALLOC: u64 = 128 * 1024 * 1024;

/// One uploaded file as it came off the wire.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Extension for a stored upload: the filename's if it is sane, else the
/// content type's, else `bin`.
pub fn ext_for(item: &UploadItem) -> String {
    let from_name = item
        .filename
        .as_deref()
        .and_then(|f| Path::new(f).extension())
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.bytes().all(|b| b.is_ascii_alphanumeric()));
    from_name
        .or_else(|| {
            item.content_type
                .as_deref()
                .and_then(ext_from_mime)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "bin".into())
}

/// Content-addressed object name: hex SHA-256 of filename and upload time.
pub fn object_key(filename: &str, ext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filename.as_bytes());
    hasher.update(OffsetDateTime::now_utc().unix_timestamp_nanos().to_be_bytes());
    format!("{}.{}", hex::encode(hasher.finalize()), ext)
}

pub fn content_type_for(ext: &str) -> String {
    mime_guess::from_ext(ext)
        .first_or_octet_stream()
        .essence_str()
        .to_owned()
}

fn decode_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

/// Decode whatever was uploaded and re-encode it as PNG. CPU bound; async
/// callers go through [`normalize_to_png_blocking`].
pub fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, AppError> {
    let mut reader = Reader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::Storage(e.into()))?;
    reader.limits(decode_limits());
    let img = reader.decode().map_err(|e| match e {
        ImageError::Limits(_) => {
            warn!(error = %e, "image upload over decode limits");
            AppError::validation("Image is too large")
        }
        _ => {
            warn!(error = %e, "undecodable image upload");
            AppError::validation("Unsupported or corrupt image")
        }
    })?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageOutputFormat::Png)
        .map_err(|e| AppError::Storage(anyhow::anyhow!("png encode: {e}")))?;
    Ok(out.into_inner())
}

/// [`normalize_to_png`] on the blocking pool.
pub async fn normalize_to_png_blocking(bytes: Vec<u8>) -> Result<Vec<u8>, AppError> {
    tokio::task::spawn_blocking(move || normalize_to_png(&bytes))
        .await
        .map_err(|e| AppError::Storage(anyhow::anyhow!("image worker: {e}")))?
}

#[cfg(test)]
pub(crate) fn sample_image(format: ImageOutputFormat) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        4,
        4,
        image::Rgb([200, 30, 30]),
    ));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode sample");
    out.into_inner()
}
