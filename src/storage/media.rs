use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};
use potion::HtmlError;

use crate::{
    config::Settings,
    constants::IMAGE_EXTENSIONS,
    error::RecipeError,
};

/// Stores uploaded images below `root` and hands out URLs below `base_url`.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    base_url: String,
}

/// A decoded `data:image/<ext>;base64,<payload>` upload.
#[derive(Debug, PartialEq, Eq)]
pub struct ImageUpload {
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn parse(data: &str, field: &str) -> Result<Self, RecipeError> {
        let invalid = || RecipeError::validation(field, "Upload a valid base64 encoded image.");

        let (header, payload) = data.trim().split_once(";base64,").ok_or_else(invalid)?;
        let extension = header
            .strip_prefix("data:image/")
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(invalid)?;

        let bytes = STANDARD.decode(payload.trim()).map_err(|_| invalid())?;
        if bytes.is_empty() {
            return Err(RecipeError::validation(field, "Image field cannot be empty."));
        }

        Ok(Self { extension, bytes })
    }
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            root: root.into(),
            base_url,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.media_root.to_owned(), settings.media_url.to_owned())
    }

    /// Writes the image to `<root>/<folder>/<uuid>.<ext>` and returns its URL.
    pub async fn save_base64_image(
        &self,
        data: &str,
        folder: &str,
        field: &str,
    ) -> Result<String, potion::Error> {
        let upload = ImageUpload::parse(data, field)?;
        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), upload.extension);

        let directory = self.root.join(folder);
        tokio::fs::create_dir_all(&directory).await.map_err(|e| {
            log::error!("Failed to create {}: {e}", directory.display());
            HtmlError::InternalServerError.new("Failed to store image")
        })?;

        let path = directory.join(&file_name);
        tokio::fs::write(&path, &upload.bytes).await.map_err(|e| {
            log::error!("Failed to write {}: {e}", path.display());
            HtmlError::InternalServerError.new("Failed to store image")
        })?;

        log::trace!("> Stored {} bytes at {}", upload.bytes.len(), path.display());

        Ok(format!("{}{folder}/{file_name}", self.base_url))
    }

    /// Removes a file previously returned by [`MediaStorage::save_base64_image`].
    /// URLs outside this storage are left alone.
    pub async fn delete(&self, url: &str) {
        let Some(relative) = url.strip_prefix(&self.base_url) else {
            return;
        };
        if relative.split('/').any(|segment| segment == "..") {
            log::warn!("Refusing to delete {url}");
            return;
        }

        let path = self.root.join(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            log::warn!("Failed to delete {}: {e}", path.display());
        }
    }
}
