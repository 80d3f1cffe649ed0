#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Remote Background Removal
//!
//! Session-driven background removal backed by a remote service (remove.bg).
//! The removal itself happens remotely; this crate owns the workflow around it:
//!
//! - **Session**: an explicit state machine (`Idle → Ready → Processing →
//!   Done | Error`) holding the selected image, the result and any error
//! - **Workflow**: an async, cloneable driver that runs one request at a time
//!   and rejects a second `submit()` while one is outstanding
//! - **Service client**: a single multipart POST with the key in `X-Api-Key`
//! - **Compositing**: preview rendering over a flat color or a checkerboard,
//!   without touching the result bytes
//! - **Previews**: scoped `preview:` handles released when superseded
//! - **CLI Integration**: optional command-line interface (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remote_bgremove::{ClientConfig, CompositeColor, SessionStatus, SourceImage, Workflow};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let workflow = Workflow::remote(ClientConfig::default())?;
//! workflow.set_api_key("your-api-key");
//!
//! let bytes = std::fs::read("portrait.jpg")?;
//! workflow.select_image(SourceImage::new(bytes, "image/jpeg", "portrait.jpg"))?;
//!
//! if workflow.submit().await? == SessionStatus::Done {
//!     workflow.toggle_composite(Some(CompositeColor::WHITE));
//!     let preview = workflow.render_composite()?;
//!     preview.save("preview.png")?;
//!
//!     let artifact = workflow.download()?;
//!     std::fs::write(&artifact.file_name, &artifact.bytes)?; // portrait-no-bg.png
//! }
//!
//! workflow.reset(); // the key is kept for the next image
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP decoding for previews
//! - `tracing-json`: JSON log output for the CLI

#[cfg(feature = "cli")]
pub mod cli;
pub mod client;
pub mod composite;
pub mod config;
pub mod error;
pub mod preview;
pub mod services;
pub mod session;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod workflow;

// Public API exports
pub use client::{BackgroundService, RemoveBgClient, ServiceFailure};
pub use composite::{Backdrop, CompositeColor, CompositeRenderer};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{BgRemovalError, Result};
pub use preview::{PreviewHandle, PreviewStore};
pub use services::{ImageIOService, OutputFormatHandler};
pub use session::{RemovalRequest, Session, SessionSnapshot, Ticket};
pub use types::{DownloadArtifact, SessionStatus, SourceImage};
pub use workflow::Workflow;

#[cfg(feature = "cli")]
pub use tracing_config::{events, init_cli_tracing, spans, TracingConfig, TracingFormat};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_exports() {
        let session = Session::default();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(ClientConfig::default().validate().is_ok());
    }
}
