//! Image I/O operations service
//!
//! Bridges the file system and the session: turns files into selections and
//! writes downloads and rendered previews back to disk.

use crate::{
    error::{BgRemovalError, Result},
    types::{DownloadArtifact, SourceImage},
};
use image::{ImageFormat, RgbaImage};
use std::path::Path;

/// Mime type reported for files that are not recognizable images
pub const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

/// Service for handling image file input/output operations
pub struct ImageIOService;

impl ImageIOService {
    /// Read a file into a selection candidate
    ///
    /// The mime type comes from the extension, falling back to content
    /// sniffing; files that are neither report [`UNKNOWN_MIME_TYPE`] and are
    /// rejected when selected.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use remote_bgremove::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_selection("input.jpg")?;
    /// assert_eq!(image.mime_type(), "image/jpeg");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load_selection<P: AsRef<Path>>(path: P) -> Result<SourceImage> {
        let path_ref = path.as_ref();

        let bytes = std::fs::read(path_ref)
            .map_err(|e| BgRemovalError::file_io_error("read image file", path_ref, &e))?;

        let mime_type = Self::mime_type_for(path_ref, &bytes);
        let file_name = path_ref
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::debug!(
            "Loaded {} ({} bytes, {})",
            path_ref.display(),
            bytes.len(),
            mime_type
        );

        Ok(SourceImage::new(bytes, mime_type, file_name))
    }

    /// Mime type for a file, from its extension or else its content
    #[must_use]
    pub fn mime_type_for(path: &Path, bytes: &[u8]) -> &'static str {
        if let Ok(format) = ImageFormat::from_path(path) {
            return format.to_mime_type();
        }

        match image::guess_format(bytes) {
            Ok(format) => {
                log::debug!(
                    "Extension lookup failed for {}, sniffed {:?} from content",
                    path.display(),
                    format
                );
                format.to_mime_type()
            },
            Err(_) => UNKNOWN_MIME_TYPE,
        }
    }

    /// Write a download artifact to `path`, creating parent directories
    pub fn save_artifact<P: AsRef<Path>>(artifact: &DownloadArtifact, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        Self::ensure_parent(path_ref)?;

        std::fs::write(path_ref, &artifact.bytes)
            .map_err(|e| BgRemovalError::file_io_error("write download", path_ref, &e))?;

        log::info!(
            "Saved {} ({} bytes) to {}",
            artifact.file_name,
            artifact.bytes.len(),
            path_ref.display()
        );
        Ok(())
    }

    /// Encode a rendered preview as PNG at `path`
    pub fn save_preview<P: AsRef<Path>>(preview: &RgbaImage, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        Self::ensure_parent(path_ref)?;

        preview.save_with_format(path_ref, ImageFormat::Png)?;
        log::debug!("Saved composite preview to {}", path_ref.display());
        Ok(())
    }

    /// Check if a file path has an image extension worth offering for selection
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .is_some_and(|ext| {
                matches!(
                    ext.as_str(),
                    "jpg" | "jpeg" | "png" | "webp" | "tiff" | "tif" | "bmp" | "gif"
                )
            })
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
                .map_err(|e| BgRemovalError::file_io_error("create output directory", parent, &e)),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[test]
    fn test_mime_type_from_extension() {
        assert_eq!(ImageIOService::mime_type_for(Path::new("a.jpg"), b""), "image/jpeg");
        assert_eq!(ImageIOService::mime_type_for(Path::new("a.PNG"), b""), "image/png");
        assert_eq!(ImageIOService::mime_type_for(Path::new("a.txt"), b"plain"), UNKNOWN_MIME_TYPE);
    }

    #[test]
    fn test_mime_type_from_content() {
        let png_magic = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(ImageIOService::mime_type_for(Path::new("upload"), png_magic), "image/png");
    }

    #[test]
    fn test_load_selection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let selection = ImageIOService::load_selection(&path).unwrap();
        assert_eq!(selection.file_name(), "notes.txt");
        assert_eq!(selection.mime_type(), UNKNOWN_MIME_TYPE);
        assert!(!selection.is_image());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ImageIOService::load_selection("/definitely/missing.jpg").unwrap_err();
        assert!(matches!(err, BgRemovalError::Io(_)));
        assert!(err.to_string().contains("read image file"));
    }

    #[test]
    fn test_save_artifact_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out/cat-no-bg.png");
        let artifact = DownloadArtifact {
            file_name: "cat-no-bg.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: Bytes::from_static(b"payload"),
        };

        ImageIOService::save_artifact(&artifact, &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"payload");
    }

    #[test]
    fn test_supported_formats() {
        assert!(ImageIOService::is_supported_format("photo.JPG"));
        assert!(ImageIOService::is_supported_format("photo.webp"));
        assert!(!ImageIOService::is_supported_format("notes.txt"));
        assert!(!ImageIOService::is_supported_format("README"));
    }
}
