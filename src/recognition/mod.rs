//! Client for the remote plate recognition service
//!
//! Owns the transport half of a capture attempt: shrink the photo the way the
//! capture app does, POST it as multipart form data, and parse the JSON reply
//! into a [`DetectionResponse`]. Transport failures come back as errors; the
//! caller turns them into a transport verdict before the decision engine is
//! ever involved.

pub mod cache;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::DetectionResponse;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use log::debug;
use reqwest::blocking::multipart;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

/// Uploads are downscaled to this width before sending
const MAX_UPLOAD_WIDTH: u32 = 800;
const JPEG_QUALITY: u8 = 80;
const DETECT_ENDPOINT: &str = "/detectar-placa";

/// Blocking HTTP client for the recognition service
#[derive(Clone)]
pub struct RecognitionClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl RecognitionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Submit one photo and parse the service's detection response.
    ///
    /// Non-success statuses become [`Error::Service`] carrying the body's
    /// `mensaje` when one can be parsed out of it.
    pub fn detect(&self, image_path: &Path) -> Result<DetectionResponse> {
        let payload = prepare_image(image_path)?;
        debug!(
            "uploading {} ({} bytes compressed)",
            image_path.display(),
            payload.len()
        );

        let part = multipart::Part::bytes(payload)
            .file_name("foto.jpg")
            .mime_str("image/jpeg")?;
        let form = multipart::Form::new().part("imagen", part);

        let url = format!("{}{}", self.base_url, DETECT_ENDPOINT);
        let response = self.http.post(&url).multipart(form).send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let mensaje = serde_json::from_str::<DetectionResponse>(&body)
                .ok()
                .and_then(|parsed| parsed.mensaje)
                .unwrap_or_else(|| body.chars().take(200).collect());
            return Err(Error::Service {
                status: status.as_u16(),
                mensaje,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Downscale and re-encode a photo for upload, like the capture app:
/// max width 800, JPEG quality 80.
pub fn prepare_image(path: &Path) -> Result<Vec<u8>> {
    let img = image::open(path)?;
    let img = if img.width() > MAX_UPLOAD_WIDTH {
        img.resize(MAX_UPLOAD_WIDTH, u32::MAX, FilterType::Triangle)
    } else {
        img
    };

    let rgb = img.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder.encode_image(&rgb)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_prepare_image_downscales_wide_photos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        RgbImage::new(1600, 1200).save(&path).unwrap();

        let payload = prepare_image(&path).unwrap();
        let reloaded = image::load_from_memory(&payload).unwrap();
        assert_eq!(reloaded.width(), MAX_UPLOAD_WIDTH);
    }

    #[test]
    fn test_prepare_image_keeps_small_photos() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.png");
        RgbImage::new(640, 480).save(&path).unwrap();

        let payload = prepare_image(&path).unwrap();
        let reloaded = image::load_from_memory(&payload).unwrap();
        assert_eq!(reloaded.width(), 640);
    }
}
