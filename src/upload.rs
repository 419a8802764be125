//! Upload forwarding.
//!
//! Uploaded files are sniffed (only PNG is accepted, whatever the filename
//! says), re-muxed through ffmpeg with all metadata dropped, and handed to
//! the library service by path. Temporary files are removed when this
//! function returns.

use std::path::Path;
use tokio::process::Command;

use crate::config::UploadConfig;
use crate::error::{GalleryError, Result};
use crate::library::LibraryClient;
use crate::models::AddFromPathOptions;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes looked at when sniffing.
pub const SNIFF_LEN: usize = 512;

/// Content sniffing: true when the data starts with the PNG signature.
pub fn is_png(data: &[u8]) -> bool {
    let head = &data[..data.len().min(SNIFF_LEN)];
    head.starts_with(&PNG_SIGNATURE)
}

/// Validates, cleans and forwards one uploaded file.
pub async fn process_upload(
    client: &dyn LibraryClient,
    config: &UploadConfig,
    data: &[u8],
) -> Result<()> {
    if !is_png(data) {
        return Err(GalleryError::UnsupportedMedia(
            "Only png files are allowed (for now)".to_string(),
        ));
    }

    let input = temp_file()?;
    let output = temp_file()?;

    tokio::fs::write(input.path(), data)
        .await
        .map_err(|e| GalleryError::Upload(format!("Failed to save uploaded file: {}", e)))?;

    strip_metadata(&config.ffmpeg, input.path(), output.path()).await?;

    let opts = AddFromPathOptions {
        path: output.path().to_string_lossy().into_owned(),
        annotation: config.annotation.clone(),
        ..Default::default()
    };
    client.add_from_path(&opts).await?;

    tracing::info!(bytes = data.len(), "upload forwarded to library");
    Ok(())
}

fn temp_file() -> Result<tempfile::NamedTempFile> {
    tempfile::Builder::new()
        .prefix("upload-")
        .suffix(".png")
        .tempfile()
        .map_err(|e| GalleryError::Upload(format!("Failed to create temp file: {}", e)))
}

/// Copies the image stream from `input` to `output` without any metadata.
pub async fn strip_metadata(ffmpeg: &Path, input: &Path, output: &Path) -> Result<()> {
    let result = Command::new(ffmpeg)
        .arg("-i")
        .arg(input)
        .args(["-map_metadata", "-1", "-c:v", "copy", "-f", "image2", "-y"])
        .arg(output)
        .output()
        .await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            tracing::warn!(
                status = %out.status,
                stderr = %String::from_utf8_lossy(&out.stderr),
                "ffmpeg failed"
            );
            Err(GalleryError::Upload("Failed to process image".to_string()))
        }
        Err(e) => {
            tracing::warn!("failed to run {}: {}", ffmpeg.display(), e);
            Err(GalleryError::Upload("Failed to process image".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApplicationInfo, Folder, Item, ItemListOptions, Tag};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    fn png_bytes() -> Vec<u8> {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        data
    }

    #[derive(Default)]
    struct Collecting {
        added: Mutex<Vec<AddFromPathOptions>>,
    }

    #[async_trait]
    impl LibraryClient for Collecting {
        async fn list_items(&self, _filter: &ItemListOptions) -> Result<Vec<Item>> {
            Ok(vec![])
        }
        async fn list_folders(&self) -> Result<Vec<Folder>> {
            Ok(vec![])
        }
        async fn list_tags(&self) -> Result<Vec<Tag>> {
            Ok(vec![])
        }
        async fn thumbnail_path(&self, _item_id: &str) -> Result<String> {
            Ok(String::new())
        }
        async fn add_from_path(&self, opts: &AddFromPathOptions) -> Result<()> {
            self.added.lock().push(opts.clone());
            Ok(())
        }
        async fn application_info(&self) -> Result<ApplicationInfo> {
            Ok(ApplicationInfo::default())
        }
    }

    #[test]
    fn sniffs_png_signature() {
        assert!(is_png(&png_bytes()));
        assert!(!is_png(b"\xFF\xD8\xFF\xE0jpeg"));
        assert!(!is_png(b"GIF89a"));
        assert!(!is_png(b""));
        assert!(!is_png(&PNG_SIGNATURE[..4]));
    }

    #[tokio::test]
    async fn non_png_is_rejected_before_processing() {
        let client = Collecting::default();
        let err = process_upload(&client, &UploadConfig::default(), b"GIF89a....")
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::UnsupportedMedia(_)));
        assert!(client.added.lock().is_empty());
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_a_processing_error() {
        let client = Collecting::default();
        let config = UploadConfig {
            ffmpeg: "/nonexistent/ffmpeg".into(),
            ..Default::default()
        };
        let err = process_upload(&client, &config, &png_bytes()).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to process image");
        assert!(client.added.lock().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cleaned_file_is_forwarded_with_annotation() {
        // `cp`-like stand-in for ffmpeg: copies argv[2] to the last argument.
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nfor last; do :; done\ncp \"$2\" \"$last\"\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let client = Collecting::default();
        let config = UploadConfig {
            ffmpeg: script,
            ..Default::default()
        };
        process_upload(&client, &config, &png_bytes()).await.unwrap();

        let added = client.added.lock();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].annotation, "Uploaded Remotely");
        assert!(added[0].path.ends_with(".png"));
    }
}
