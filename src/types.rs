//! Core value types shared by the session, the client and the CLI

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Workflow status of a session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing selected
    #[default]
    Idle,
    /// An image is selected and can be submitted
    Ready,
    /// A removal request is outstanding
    Processing,
    /// The last request succeeded and a result is held
    Done,
    /// The last request failed; an error message is held
    Error,
}

impl SessionStatus {
    /// States from which `submit()` may start a request
    #[must_use]
    pub fn accepts_submit(self) -> bool {
        matches!(self, Self::Ready | Self::Done | Self::Error)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Ready => write!(f, "ready"),
            Self::Processing => write!(f, "processing"),
            Self::Done => write!(f, "done"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A user-selected original image
///
/// Cloning is cheap: the payload is reference counted.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    bytes: Bytes,
    mime_type: String,
    file_name: String,
}

impl SourceImage {
    pub fn new(
        bytes: impl Into<Bytes>,
        mime_type: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            file_name: file_name.into(),
        }
    }

    /// Whether the declared mime type names an image (`image/*`)
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .strip_prefix("image/")
            .is_some_and(|subtype| !subtype.is_empty())
    }

    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// A synthesized file handed to the host for saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    /// Suggested file name, e.g. `cat-no-bg.png`
    pub file_name: String,
    /// Mime type of `bytes`
    pub mime_type: String,
    /// Result bytes exactly as returned by the service
    pub bytes: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image() {
        assert!(SourceImage::new(vec![1u8], "image/jpeg", "a.jpg").is_image());
        assert!(SourceImage::new(vec![1u8], "IMAGE/PNG", "a.png").is_image());
        assert!(!SourceImage::new(vec![1u8], "image/", "a").is_image());
        assert!(!SourceImage::new(vec![1u8], "text/plain", "a.txt").is_image());
        assert!(!SourceImage::new(vec![1u8], "application/octet-stream", "a.bin").is_image());
    }

    #[test]
    fn test_status_submit_gate() {
        assert!(!SessionStatus::Idle.accepts_submit());
        assert!(SessionStatus::Ready.accepts_submit());
        assert!(!SessionStatus::Processing.accepts_submit());
        assert!(SessionStatus::Done.accepts_submit());
        assert!(SessionStatus::Error.accepts_submit());
    }

    #[test]
    fn test_debug_hides_payload() {
        let image = SourceImage::new(vec![0u8; 2048], "image/jpeg", "cat.jpg");
        let debug = format!("{image:?}");
        assert!(debug.contains("len: 2048"));
        assert!(!debug.contains("[0, 0"));
    }
}
