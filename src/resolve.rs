//! Thumbnail and full-resolution path resolution.
//!
//! The library service only hands out thumbnail paths. Those look like
//! `/library/images/ABC123.info/sunset_thumbnail.png`, and the original file
//! sits next to it under the same stem with its real extension. Resolution:
//!
//! 1. ask the library service for the thumbnail path;
//! 2. percent-decode it;
//! 3. require the thumbnail to exist on disk;
//! 4. for full quality only, strip `_thumbnail.png` and probe the known
//!    extensions in priority order, falling back to the thumbnail.
//!
//! Nothing is cached. Every existence check is stale as soon as it returns,
//! which is fine for a single-operator gallery.

use percent_encoding::percent_decode_str;
#[cfg(unix)]
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{GalleryError, Result};
use crate::library::LibraryClient;

/// Suffix the library service appends to generated previews.
pub const THUMBNAIL_SUFFIX: &str = "_thumbnail.png";

/// Full-resolution extensions, in the order they are probed. The first hit
/// wins even when several siblings exist.
pub const FULL_RES_EXTENSIONS: [&str; 7] =
    [".jpeg", ".jpg", ".png", ".gif", ".svg", ".webp", ".avif"];

/// Resolves the file to serve for `item_id`.
///
/// Full-quality requests never fail just because no original was found: the
/// thumbnail is returned instead.
pub async fn resolve_display_path(
    client: &dyn LibraryClient,
    item_id: &str,
    full_quality: bool,
) -> Result<PathBuf> {
    let raw = client.thumbnail_path(item_id).await?;
    let thumbnail = unescape_path(&raw)?;

    if let Err(e) = tokio::fs::metadata(&thumbnail).await {
        return Err(GalleryError::NotFound(format!(
            "{}: {}",
            thumbnail.display(),
            e
        )));
    }

    if !full_quality {
        return Ok(thumbnail);
    }

    for candidate in full_resolution_candidates(&thumbnail) {
        if tokio::fs::metadata(&candidate).await.is_ok() {
            tracing::debug!(item_id, path = %candidate.display(), "resolved full resolution file");
            return Ok(candidate);
        }
    }

    tracing::debug!(item_id, path = %thumbnail.display(), "no full resolution sibling, serving thumbnail");
    Ok(thumbnail)
}

/// Sibling paths that may hold the original for a thumbnail, in probe order.
///
/// Empty when the path does not carry the thumbnail suffix, i.e. it already
/// is the file to serve.
pub fn full_resolution_candidates(thumbnail: &Path) -> Vec<PathBuf> {
    let bytes = thumbnail.as_os_str().as_encoded_bytes();
    let Some(root) = bytes.strip_suffix(THUMBNAIL_SUFFIX.as_bytes()) else {
        return Vec::new();
    };
    FULL_RES_EXTENSIONS
        .iter()
        .filter_map(|ext| {
            let mut candidate = root.to_vec();
            candidate.extend_from_slice(ext.as_bytes());
            path_from_bytes(candidate).ok()
        })
        .collect()
}

/// Strict percent-decoding for paths.
///
/// Every `%` must introduce two hex digits and `+` stays a literal plus.
/// Decoded bytes are kept as they are, so file names that are not UTF-8
/// still resolve on Unix.
pub fn unescape_path(raw: &str) -> Result<PathBuf> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(GalleryError::PathDecode(format!(
                    "invalid URL escape {:?}",
                    String::from_utf8_lossy(&bytes[i..end])
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    path_from_bytes(percent_decode_str(raw).collect())
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Ok(PathBuf::from(OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Result<PathBuf> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|e| GalleryError::PathDecode(format!("decoded path is not UTF-8: {}", e)))
}

/// Content type for a served image, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpeg") | Some("jpg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddFromPathOptions, ApplicationInfo, Folder, Item, ItemListOptions, Tag};
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    /// Library stub that only knows thumbnail paths.
    struct ThumbnailOnly(String);

    #[async_trait]
    impl LibraryClient for ThumbnailOnly {
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
            Ok(self.0.clone())
        }
        async fn add_from_path(&self, _opts: &AddFromPathOptions) -> Result<()> {
            Ok(())
        }
        async fn application_info(&self) -> Result<ApplicationInfo> {
            Ok(ApplicationInfo::default())
        }
    }

    /// Percent-encodes a path the way the library service does.
    fn encoded(path: &Path) -> String {
        path.to_str().unwrap().replace('%', "%25").replace('/', "%2F").replace(' ', "%20")
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"x").unwrap();
        path
    }

    #[test]
    fn candidates_follow_priority_order() {
        let candidates = full_resolution_candidates(Path::new("/data/ABC123_thumbnail.png"));
        let expected: Vec<PathBuf> = [
            "/data/ABC123.jpeg",
            "/data/ABC123.jpg",
            "/data/ABC123.png",
            "/data/ABC123.gif",
            "/data/ABC123.svg",
            "/data/ABC123.webp",
            "/data/ABC123.avif",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        assert_eq!(candidates, expected);
    }

    #[test]
    fn no_candidates_without_thumbnail_suffix() {
        assert!(full_resolution_candidates(Path::new("/data/ABC123.jpg")).is_empty());
        assert!(full_resolution_candidates(Path::new("/data/ABC123_thumbnail.jpg")).is_empty());
    }

    #[test]
    fn unescape_decodes_paths() {
        assert_eq!(
            unescape_path("%2Fdata%2FABC123_thumbnail.png").unwrap(),
            PathBuf::from("/data/ABC123_thumbnail.png")
        );
        assert_eq!(
            unescape_path("/a+b/c%20d.png").unwrap(),
            PathBuf::from("/a+b/c d.png")
        );
    }

    #[test]
    fn unescape_rejects_malformed_escapes() {
        for raw in ["%zz/a.png", "/a.png%", "/a%2", "%%41"] {
            let err = unescape_path(raw).unwrap_err();
            assert!(matches!(err, GalleryError::PathDecode(_)), "{}", raw);
        }
    }

    #[cfg(unix)]
    #[test]
    fn unescape_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;
        let path = unescape_path("%2Fdata%2Fcaf%E9_thumbnail.png").unwrap();
        assert_eq!(path.as_os_str().as_bytes(), b"/data/caf\xE9_thumbnail.png");

        let candidates = full_resolution_candidates(&path);
        assert_eq!(candidates[0].as_os_str().as_bytes(), b"/data/caf\xE9.jpeg");
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("/a/b.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("/a/b_thumbnail.png")), "image/png");
        assert_eq!(content_type_for(Path::new("/a/b.svg")), "image/svg+xml");
        assert_eq!(content_type_for(Path::new("/a/b")), "application/octet-stream");
    }

    #[tokio::test]
    async fn thumbnail_served_without_full_quality() {
        let dir = TempDir::new().unwrap();
        let thumb = touch(&dir, "ABC123_thumbnail.png");
        touch(&dir, "ABC123.png");
        let client = ThumbnailOnly(encoded(&thumb));

        let path = resolve_display_path(&client, "ABC123", false).await.unwrap();
        assert_eq!(path, thumb);
    }

    #[tokio::test]
    async fn full_quality_prefers_jpg_over_png() {
        let dir = TempDir::new().unwrap();
        let thumb = touch(&dir, "ABC123_thumbnail.png");
        let jpg = touch(&dir, "ABC123.jpg");
        touch(&dir, "ABC123.png");
        let client = ThumbnailOnly(encoded(&thumb));

        let path = resolve_display_path(&client, "ABC123", true).await.unwrap();
        assert_eq!(path, jpg);
    }

    #[tokio::test]
    async fn full_quality_falls_back_to_thumbnail() {
        let dir = TempDir::new().unwrap();
        let thumb = touch(&dir, "ABC123_thumbnail.png");
        touch(&dir, "ABC123.tiff");
        let client = ThumbnailOnly(encoded(&thumb));

        let path = resolve_display_path(&client, "ABC123", true).await.unwrap();
        assert_eq!(path, thumb);
    }

    #[tokio::test]
    async fn path_without_suffix_is_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let original = touch(&dir, "ABC123.gif");
        touch(&dir, "ABC123.jpeg");
        let client = ThumbnailOnly(encoded(&original));

        let path = resolve_display_path(&client, "ABC123", true).await.unwrap();
        assert_eq!(path, original);
    }

    #[tokio::test]
    async fn missing_thumbnail_is_not_found_even_with_full_quality() {
        let dir = TempDir::new().unwrap();
        touch(&dir, "ABC123.jpg");
        let thumb = dir.path().join("ABC123_thumbnail.png");
        let client = ThumbnailOnly(encoded(&thumb));

        for fq in [false, true] {
            let err = resolve_display_path(&client, "ABC123", fq).await.unwrap_err();
            assert!(matches!(err, GalleryError::NotFound(_)));
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn non_utf8_thumbnail_name_resolves() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let thumb = dir.path().join(OsStr::from_bytes(b"caf\xE9_thumbnail.png"));
        fs::write(&thumb, b"x").unwrap();
        let original = dir.path().join(OsStr::from_bytes(b"caf\xE9.webp"));
        fs::write(&original, b"x").unwrap();
        let raw = format!("{}%2Fcaf%E9_thumbnail.png", encoded(dir.path()));
        let client = ThumbnailOnly(raw);

        assert_eq!(resolve_display_path(&client, "CAFE", false).await.unwrap(), thumb);
        assert_eq!(resolve_display_path(&client, "CAFE", true).await.unwrap(), original);
    }
}
