//! Async driver tying a [`Session`] to a [`BackgroundService`]
//!
//! A [`Workflow`] is a cheap, cloneable handle. The session lock is only held
//! for the synchronous transitions, never across the network await, so other
//! handles can observe `Processing`, toggle the composite color, or reset while
//! a request is outstanding.

use crate::{
    client::{BackgroundService, RemoveBgClient},
    composite::{CompositeColor, CompositeRenderer},
    config::ClientConfig,
    error::Result,
    session::{Session, SessionSnapshot},
    types::{DownloadArtifact, SessionStatus, SourceImage},
};
use image::RgbaImage;
use instant::Instant;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument};

/// Shared handle driving one session
#[derive(Clone)]
pub struct Workflow {
    session: Arc<Mutex<Session>>,
    service: Arc<dyn BackgroundService>,
    renderer: CompositeRenderer,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("session", &*self.lock())
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Drive a fresh session with `service`
    pub fn new<S: BackgroundService + 'static>(service: S) -> Self {
        Self::with_session(Session::new(), Arc::new(service))
    }

    /// Drive an existing session
    #[must_use]
    pub fn with_session(session: Session, service: Arc<dyn BackgroundService>) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            service,
            renderer: CompositeRenderer::new(),
        }
    }

    /// Workflow backed by the HTTP client
    ///
    /// # Errors
    /// - Invalid client configuration
    pub fn remote(config: ClientConfig) -> Result<Self> {
        Ok(Self::new(RemoveBgClient::new(config)?))
    }

    /// Use a custom renderer for composite previews
    #[must_use]
    pub fn with_renderer(mut self, renderer: CompositeRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// See [`Session::select_image`]
    pub fn select_image(&self, image: SourceImage) -> Result<()> {
        self.lock().select_image(image)
    }

    /// See [`Session::set_api_key`]
    pub fn set_api_key(&self, key: impl Into<String>) {
        self.lock().set_api_key(key);
    }

    /// Run one removal request to completion
    ///
    /// Returns the status after the request settled: `Done` or `Error`.
    /// A request abandoned by `reset()` always reports `Idle`, even if the
    /// session has since moved on to a new selection or request.
    ///
    /// # Errors
    /// - [`crate::BgRemovalError::AlreadyInProgress`] if another submit is outstanding
    /// - [`crate::BgRemovalError::Precondition`] without an image or a key
    ///
    /// Service failures are not errors here; they land in the session's
    /// error message with status `Error`.
    #[instrument(skip(self))]
    pub async fn submit(&self) -> Result<SessionStatus> {
        let request = self.lock().begin_removal()?;
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            () = request.cancellation().cancelled() => {
                debug!(ticket = ?request.ticket(), "Request abandoned after reset");
                return Ok(SessionStatus::Idle);
            }
            outcome = self.service.remove_background(request.image(), request.api_key()) => outcome,
        };

        let mut session = self.lock();
        let applied = session.complete_removal(request.ticket(), outcome);
        info!(
            applied,
            status = %session.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Removal request settled"
        );
        Ok(session.status())
    }

    /// See [`Session::toggle_composite`]
    pub fn toggle_composite(&self, color: Option<CompositeColor>) {
        self.lock().toggle_composite(color);
    }

    /// Render the result over the current composite backdrop
    ///
    /// # Errors
    /// See [`Session::render_composite`]
    pub fn render_composite(&self) -> Result<RgbaImage> {
        self.lock().render_composite(&self.renderer)
    }

    /// See [`Session::download`]
    pub fn download(&self) -> Result<DownloadArtifact> {
        self.lock().download()
    }

    /// See [`Session::reset`]
    pub fn reset(&self) {
        self.lock().reset();
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    /// Run `f` with read access to the session
    pub fn inspect<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
