//! Scoped display handles for image previews
//!
//! A [`PreviewStore`] plays the role of an object-URL registry: hosts resolve a
//! `preview:` URI to the bytes it names. Each [`PreviewHandle`] owns exactly one
//! registration and releases it when dropped, so a session that replaces or
//! resets its images never leaves entries behind.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

const URI_SCHEME: &str = "preview:";

#[derive(Debug, Clone)]
struct PreviewEntry {
    bytes: Bytes,
    mime_type: String,
}

/// Registry of live preview URIs
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<String, PreviewEntry>>>,
}

impl PreviewStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and return the handle that owns the registration
    #[must_use]
    pub fn register(&self, bytes: Bytes, mime_type: impl Into<String>) -> PreviewHandle {
        let uri = format!("{URI_SCHEME}{}", Uuid::new_v4());
        let entry = PreviewEntry {
            bytes,
            mime_type: mime_type.into(),
        };
        self.lock().insert(uri.clone(), entry);
        tracing::trace!(uri = %uri, "Preview registered");

        PreviewHandle {
            uri,
            store: self.clone(),
        }
    }

    /// Look up the bytes and mime type behind a URI
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<(Bytes, String)> {
        self.lock()
            .get(uri)
            .map(|entry| (entry.bytes.clone(), entry.mime_type.clone()))
    }

    /// Number of registrations not yet released
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, uri: &str) {
        if self.lock().remove(uri).is_some() {
            tracing::trace!(uri = %uri, "Preview released");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PreviewEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owner of one preview registration
///
/// Not `Clone`: the registration is released once, when this value drops.
#[derive(Debug)]
pub struct PreviewHandle {
    uri: String,
    store: PreviewStore,
}

impl PreviewHandle {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(&self.uri);
    }
}
