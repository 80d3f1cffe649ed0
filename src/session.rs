//! Workflow state machine for one upload-to-download cycle
//!
//! `Idle → Ready → Processing → {Done, Error}`; `Ready`, `Done` and `Error`
//! may re-enter `Processing`, and every state may [`Session::reset`] to `Idle`.
//!
//! The network call is split around the state machine: [`Session::begin_removal`]
//! performs the transition to `Processing` and hands out a [`RemovalRequest`];
//! [`Session::complete_removal`] applies the outcome. A request carries a
//! ticket, and only the ticket of the outstanding request is accepted, so a
//! completion arriving after `reset()` is dropped.
//!
//! Invariants held after every public method:
//! - a result is held iff the status is `Done`
//! - an error message is held iff the status is `Error`
//! - no source image is held iff the status is `Idle`

use crate::{
    client::ServiceFailure,
    composite::{CompositeColor, CompositeRenderer},
    error::{BgRemovalError, Result},
    preview::{PreviewHandle, PreviewStore},
    services::OutputFormatHandler,
    types::{DownloadArtifact, SessionStatus, SourceImage},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message used when `submit()` lacks an image or a credential
pub const MISSING_INPUT_MESSAGE: &str = "missing image or key";

/// Identifies one removal request within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Everything the driver needs to perform one removal
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    ticket: Ticket,
    image: SourceImage,
    api_key: String,
    cancellation: CancellationToken,
}

impl RemovalRequest {
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    #[must_use]
    pub fn image(&self) -> &SourceImage {
        &self.image
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Cancelled when the session is reset while this request is outstanding
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

#[derive(Debug)]
struct InFlight {
    ticket: Ticket,
    cancellation: CancellationToken,
}

#[derive(Debug)]
struct Selection {
    image: SourceImage,
    preview: PreviewHandle,
}

#[derive(Debug)]
struct Processed {
    bytes: Bytes,
    extension: &'static str,
    mime_type: &'static str,
    preview: PreviewHandle,
}

/// The single mutable state of one upload-to-download cycle
pub struct Session {
    id: Uuid,
    store: PreviewStore,
    status: SessionStatus,
    source: Option<Selection>,
    result: Option<Processed>,
    error_message: Option<String>,
    composite_color: Option<CompositeColor>,
    api_key: Option<String>,
    in_flight: Option<InFlight>,
    next_ticket: u64,
    updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("source", &self.source.as_ref().map(|s| &s.image))
            .field("result_bytes", &self.result.as_ref().map(|r| r.bytes.len()))
            .field("error_message", &self.error_message)
            .field("composite_color", &self.composite_color)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create an empty (`Idle`) session with its own preview store
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(PreviewStore::new())
    }

    /// Create an empty session registering previews in `store`
    #[must_use]
    pub fn with_store(store: PreviewStore) -> Self {
        Self {
            id: Uuid::new_v4(),
            store,
            status: SessionStatus::Idle,
            source: None,
            result: None,
            error_message: None,
            composite_color: None,
            api_key: None,
            in_flight: None,
            next_ticket: 0,
            updated_at: Utc::now(),
        }
    }

    /// Select an image, discarding any previous result or error
    ///
    /// # Errors
    /// - [`BgRemovalError::Validation`] if the mime type is not `image/*`
    /// - [`BgRemovalError::AlreadyInProgress`] while a request is outstanding
    ///
    /// Neither error changes the session.
    pub fn select_image(&mut self, image: SourceImage) -> Result<()> {
        if !image.is_image() {
            debug!(session_id = %self.id, mime_type = %image.mime_type(), "Ignoring non-image selection");
            return Err(BgRemovalError::validation(format!(
                "'{}' is not an image (mime type '{}')",
                image.file_name(),
                image.mime_type()
            )));
        }
        if self.status == SessionStatus::Processing {
            return Err(BgRemovalError::AlreadyInProgress);
        }

        let preview = self
            .store
            .register(image.bytes().clone(), image.mime_type().to_string());
        info!(
            session_id = %self.id,
            file = %image.file_name(),
            bytes = image.len(),
            "Image selected"
        );

        self.source = Some(Selection { image, preview });
        self.result = None;
        self.error_message = None;
        self.transition(SessionStatus::Ready);
        Ok(())
    }

    /// Store the credential; it is only checked by the remote service
    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
        self.touch();
    }

    /// Start a removal request
    ///
    /// Moves the session to `Processing`, clears the previous error and
    /// result, and returns the request the driver must send.
    ///
    /// # Errors
    /// - [`BgRemovalError::AlreadyInProgress`] while a request is outstanding
    /// - [`BgRemovalError::Precondition`] without an image or a non-empty key
    ///
    /// Neither error changes the session.
    pub fn begin_removal(&mut self) -> Result<RemovalRequest> {
        if self.status == SessionStatus::Processing {
            return Err(BgRemovalError::AlreadyInProgress);
        }

        let key = self.api_key.as_deref().filter(|key| !key.is_empty());
        let (image, api_key) = match (&self.source, key) {
            (Some(selection), Some(key)) if self.status.accepts_submit() => {
                (selection.image.clone(), key.to_string())
            },
            _ => return Err(BgRemovalError::precondition(MISSING_INPUT_MESSAGE)),
        };

        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        let cancellation = CancellationToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            cancellation: cancellation.clone(),
        });
        self.error_message = None;
        self.result = None;
        self.transition(SessionStatus::Processing);

        Ok(RemovalRequest {
            ticket,
            image,
            api_key,
            cancellation,
        })
    }

    /// Apply the outcome of the request identified by `ticket`
    ///
    /// Returns `false` (leaving the session untouched) when `ticket` is not the
    /// outstanding request, e.g. after `reset()`.
    pub fn complete_removal(
        &mut self,
        ticket: Ticket,
        outcome: std::result::Result<Bytes, ServiceFailure>,
    ) -> bool {
        match &self.in_flight {
            Some(in_flight) if in_flight.ticket == ticket => {},
            _ => {
                debug!(session_id = %self.id, ticket = ticket.0, "Discarding stale completion");
                return false;
            },
        }
        self.in_flight = None;

        match outcome {
            Ok(bytes) => {
                let extension = OutputFormatHandler::extension_for(&bytes);
                let mime_type = OutputFormatHandler::mime_type_for(&bytes);
                if let Some(format) = OutputFormatHandler::detect_format(&bytes) {
                    if !OutputFormatHandler::supports_transparency(format) {
                        warn!(session_id = %self.id, ?format, "Result format carries no transparency");
                    }
                }
                let preview = self.store.register(bytes.clone(), mime_type);
                info!(session_id = %self.id, result_bytes = bytes.len(), "Removal completed");

                self.result = Some(Processed {
                    bytes,
                    extension,
                    mime_type,
                    preview,
                });
                self.transition(SessionStatus::Done);
            },
            Err(failure) => {
                warn!(session_id = %self.id, error = %failure, "Removal failed");
                self.error_message = Some(failure.to_string());
                self.transition(SessionStatus::Error);
            },
        }
        true
    }

    /// Set or clear the preview backdrop color
    ///
    /// Has no effect on the result bytes and never involves the service.
    pub fn toggle_composite(&mut self, color: Option<CompositeColor>) {
        self.composite_color = color;
        self.touch();
    }

    /// Render the result over the composite color (or the checkerboard)
    ///
    /// # Errors
    /// - [`BgRemovalError::NoResult`] without a result
    /// - [`BgRemovalError::Image`] if the result bytes cannot be decoded
    pub fn render_composite(&self, renderer: &CompositeRenderer) -> Result<RgbaImage> {
        let result = self.result.as_ref().ok_or(BgRemovalError::NoResult)?;
        renderer.render_bytes(&result.bytes, self.composite_color)
    }

    /// Produce the named result file for the host to save
    ///
    /// # Errors
    /// - [`BgRemovalError::NoResult`] unless the session is `Done`
    pub fn download(&self) -> Result<DownloadArtifact> {
        let result = match (&self.result, self.status) {
            (Some(result), SessionStatus::Done) => result,
            _ => return Err(BgRemovalError::NoResult),
        };
        let original = self
            .source
            .as_ref()
            .map_or("", |selection| selection.image.file_name());

        Ok(DownloadArtifact {
            file_name: OutputFormatHandler::download_name(original, result.extension),
            mime_type: result.mime_type.to_string(),
            bytes: result.bytes.clone(),
        })
    }

    /// Return to `Idle`, releasing every image reference; the key is kept
    ///
    /// An outstanding request is cancelled and its completion will be ignored.
    pub fn reset(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!(session_id = %self.id, ticket = in_flight.ticket.0, "Cancelling outstanding request");
            in_flight.cancellation.cancel();
        }
        self.source = None;
        self.result = None;
        self.error_message = None;
        self.composite_color = None;
        self.transition(SessionStatus::Idle);
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source.as_ref().map(|selection| &selection.image)
    }

    #[must_use]
    pub fn preview_uri(&self) -> Option<&str> {
        self.source.as_ref().map(|selection| selection.preview.uri())
    }

    #[must_use]
    pub fn result_image(&self) -> Option<&Bytes> {
        self.result.as_ref().map(|result| &result.bytes)
    }

    #[must_use]
    pub fn result_preview_uri(&self) -> Option<&str> {
        self.result.as_ref().map(|result| result.preview.uri())
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    #[must_use]
    pub fn composite_color(&self) -> Option<CompositeColor> {
        self.composite_color
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn preview_store(&self) -> &PreviewStore {
        &self.store
    }

    /// Serializable view of the session; never includes the credential
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let source = self.source_image();
        SessionSnapshot {
            session_id: self.id.to_string(),
            status: self.status,
            source_file_name: source.map(|image| image.file_name().to_string()),
            source_mime_type: source.map(|image| image.mime_type().to_string()),
            source_bytes: source.map(SourceImage::len),
            preview_uri: self.preview_uri().map(str::to_string),
            result_bytes: self.result.as_ref().map(|result| result.bytes.len()),
            result_format: self.result.as_ref().map(|result| result.extension.to_string()),
            result_preview_uri: self.result_preview_uri().map(str::to_string),
            error_message: self.error_message.clone(),
            composite_color: self.composite_color,
            has_api_key: self.api_key.as_deref().is_some_and(|key| !key.is_empty()),
            updated_at: self.updated_at,
        }
    }

    fn transition(&mut self, next: SessionStatus) {
        if self.status != next {
            debug!(session_id = %self.id, from = %self.status, to = %next, "Status changed");
        }
        self.status = next;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Read-only, serializable view of a [`Session`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub source_file_name: Option<String>,
    pub source_mime_type: Option<String>,
    pub source_bytes: Option<usize>,
    pub preview_uri: Option<String>,
    pub result_bytes: Option<usize>,
    pub result_format: Option<String>,
    pub result_preview_uri: Option<String>,
    pub error_message: Option<String>,
    pub composite_color: Option<CompositeColor>,
    pub has_api_key: bool,
    pub updated_at: DateTime<Utc>,
}
