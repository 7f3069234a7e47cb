//! Image uploads to Cloudinary using an unsigned upload preset.

use reqwest::multipart;
use serde::Deserialize;
use waypost_core::{
  Error, Result,
  external::{ImageHost, ImageUpload},
};

/// Cloudinary-backed [`ImageHost`].
#[derive(Clone)]
pub struct CloudinaryHost {
  client:        reqwest::Client,
  upload_url:    String,
  upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
  secure_url: String,
}

impl CloudinaryHost {
  pub fn new(
    client: reqwest::Client,
    cloud_name: &str,
    upload_preset: String,
  ) -> Self {
    Self {
      client,
      upload_url: format!("https://api.cloudinary.com/v1_1/{cloud_name}/image/upload"),
      upload_preset,
    }
  }
}

impl ImageHost for CloudinaryHost {
  async fn upload(&self, image: ImageUpload) -> Result<String> {
    let mut part = multipart::Part::bytes(image.bytes.to_vec())
      .file_name(image.filename.unwrap_or_else(|| "upload".to_owned()));
    if let Some(content_type) = &image.content_type {
      part = part
        .mime_str(content_type)
        .map_err(|e| Error::UploadFailed(e.to_string()))?;
    }

    let form = multipart::Form::new()
      .text("upload_preset", self.upload_preset.clone())
      .part("file", part);

    let resp = self
      .client
      .post(&self.upload_url)
      .multipart(form)
      .send()
      .await
      .map_err(|e| Error::UploadFailed(e.to_string()))?;

    if !resp.status().is_success() {
      return Err(Error::UploadFailed(format!(
        "cloudinary returned {}",
        resp.status()
      )));
    }

    let body: UploadResponse = resp
      .json()
      .await
      .map_err(|e| Error::UploadFailed(e.to_string()))?;

    Ok(body.secure_url)
  }
}
