//! Image store: a directory of received images named by capture time.
//!
//! Files are written once and never overwritten; a second image captured in
//! the same second gets a numeric suffix.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

use bytes::Bytes;
use chrono::{DateTime, Local};
use snapsheet_core::{ImageRef, PipelineError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::mime_detect::{detect_mime_type, extension_for, is_image, sniff_image_mime};

const FILE_NAME_FORMAT: &str = "image_%Y%m%d_%H%M%S";
const MAX_NAME_COLLISIONS: u32 = 1000;

#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir).await.map_err(|e| {
            PipelineError::Storage(format!("cannot create {}: {e}", self.dir.display()))
        })
    }

    /// Save image bytes under a name derived from `captured_at`.
    pub async fn save(&self, data: &[u8], captured_at: DateTime<Local>) -> Result<ImageRef, PipelineError> {
        self.ensure_dir().await?;

        let stem = captured_at.format(FILE_NAME_FORMAT).to_string();
        let ext = extension_for(sniff_image_mime(data).unwrap_or("image/jpeg"));

        for attempt in 0..MAX_NAME_COLLISIONS {
            let name = if attempt == 0 {
                format!("{stem}.{ext}")
            } else {
                format!("{stem}_{attempt}.{ext}")
            };
            let path = self.dir.join(name);

            let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PipelineError::Storage(format!("cannot create {}: {e}", path.display())));
                }
            };
            file.write_all(data)
                .await
                .and(file.flush().await)
                .map_err(|e| PipelineError::Storage(format!("cannot write {}: {e}", path.display())))?;

            info!(image = %path.display(), bytes = data.len(), "Saved image");
            return Ok(ImageRef::new(path));
        }

        Err(PipelineError::Storage(format!("too many images named {stem} in {}", self.dir.display())))
    }

    /// The most recently modified image file in the store.
    ///
    /// Ties on modification time are broken by file name, which embeds the
    /// capture timestamp.
    pub async fn latest(&self) -> Result<ImageRef, PipelineError> {
        let not_found = || PipelineError::ImageNotFound(self.dir.display().to_string());

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                return Err(PipelineError::Storage(format!("cannot list {}: {e}", self.dir.display())));
            }
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::Storage(e.to_string()))?
        {
            let path = entry.path();
            if !is_image(detect_mime_type(&path)) {
                continue;
            }
            let Ok(meta) = entry.metadata().await else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let candidate = (modified, path);
            if newest.as_ref().is_none_or(|current| candidate > *current) {
                newest = Some(candidate);
            }
        }

        let (_, path) = newest.ok_or_else(not_found)?;
        debug!(image = %path.display(), "Latest image");
        Ok(ImageRef::new(path))
    }

    /// Read a stored image.
    pub async fn read(&self, image: &ImageRef) -> Result<Bytes, PipelineError> {
        match fs::read(image.path()).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PipelineError::ImageNotFound(image.to_string()))
            }
            Err(e) => Err(PipelineError::Storage(format!("cannot read {image}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn saves_with_timestamp_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("saved_images"));
        let image = store.save(JPEG, at(9, 30, 0)).await.unwrap();
        assert_eq!(image.path().file_name().unwrap(), "image_20240501_093000.jpg");
        assert_eq!(store.read(&image).await.unwrap().as_ref(), JPEG);
    }

    #[tokio::test]
    async fn same_second_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let first = store.save(JPEG, at(9, 30, 0)).await.unwrap();
        let second = store.save(b"\x89PNG\r\n\x1a\n", at(9, 30, 0)).await.unwrap();
        let third = store.save(JPEG, at(9, 30, 0)).await.unwrap();
        assert_eq!(first.path().file_name().unwrap(), "image_20240501_093000.jpg");
        assert_eq!(second.path().file_name().unwrap(), "image_20240501_093000.png");
        assert_eq!(third.path().file_name().unwrap(), "image_20240501_093000_1.jpg");
        assert_eq!(store.read(&first).await.unwrap().as_ref(), JPEG);
    }

    #[tokio::test]
    async fn empty_or_missing_store_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ImageStore::new(dir.path().join("does-not-exist"));
        assert!(matches!(missing.latest().await, Err(PipelineError::ImageNotFound(_))));

        let store = ImageStore::new(dir.path());
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        assert!(matches!(store.latest().await, Err(PipelineError::ImageNotFound(_))));
    }

    #[tokio::test]
    async fn latest_prefers_most_recently_modified() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        std::fs::write(dir.path().join("image_20990101_000000.jpg"), JPEG).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        std::fs::write(dir.path().join("image_20000101_000000.jpg"), JPEG).unwrap();

        let latest = store.latest().await.unwrap();
        assert_eq!(latest.path().file_name().unwrap(), "image_20000101_000000.jpg");
    }

    #[tokio::test]
    async fn reading_a_deleted_image_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let image = ImageRef::new(dir.path().join("gone.jpg"));
        assert!(matches!(store.read(&image).await, Err(PipelineError::ImageNotFound(_))));
    }
}
