use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::AppError;

const PROFILE_PICTURE_DIR: &str = "profile_pictures";
const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("File size exceeds {0} byte limit")]
    TooLarge(usize),
    #[error("Only JPEG, PNG, GIF and WebP images are allowed")]
    UnsupportedType,
    #[error("failed to write media file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Io(err) => {
                log::error!("Media storage error: {:?}", err);
                AppError::InternalServerError("Failed to store profile picture".to_string())
            }
            other => AppError::validation("profile_picture", other.to_string()),
        }
    }
}

/// Local storage for uploaded profile pictures. Records keep the path
/// relative to `root`.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    max_upload_bytes: usize,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Checks size and sniffed content type, returning the file extension.
    pub fn check(&self, bytes: &[u8]) -> Result<&'static str, MediaError> {
        if bytes.len() > self.max_upload_bytes {
            return Err(MediaError::TooLarge(self.max_upload_bytes));
        }
        let file_type = infer::get(bytes).ok_or(MediaError::UnsupportedType)?;
        if !ALLOWED_TYPES.contains(&file_type.mime_type()) {
            return Err(MediaError::UnsupportedType);
        }
        Ok(file_type.extension())
    }

    pub async fn save_profile_picture(&self, bytes: &[u8]) -> Result<String, MediaError> {
        let extension = self.check(bytes)?;
        let relative = format!("{}/{}.{}", PROFILE_PICTURE_DIR, Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(self.root.join(PROFILE_PICTURE_DIR)).await?;
        tokio::fs::write(self.root.join(&relative), bytes).await?;
        Ok(relative)
    }

    /// Best-effort removal; a missing file is not an error.
    pub async fn remove(&self, relative: &str) {
        if let Err(err) = tokio::fs::remove_file(self.root.join(relative)).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("Failed to remove media file {}: {}", relative, err);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::PNG;
    use super::*;

    #[tokio::test]
    async fn saves_and_removes_png() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path(), 1024);

        let relative = media.save_profile_picture(PNG).await.unwrap();
        assert!(relative.starts_with("profile_pictures/"));
        assert!(relative.ends_with(".png"));
        assert!(dir.path().join(&relative).exists());

        media.remove(&relative).await;
        assert!(!dir.path().join(&relative).exists());
    }

    #[test]
    fn rejects_non_images_and_oversized_files() {
        let media = MediaStore::new("unused", 8);
        assert!(matches!(media.check(b"plain text"), Err(MediaError::TooLarge(8))));

        let media = MediaStore::new("unused", 1024);
        assert!(matches!(media.check(b"plain text"), Err(MediaError::UnsupportedType)));
        assert_eq!(media.check(PNG).unwrap(), "png");
    }
}
