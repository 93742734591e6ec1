//! # tunebot
//!
//! Telegram music bot: search a track by name, pick a result from an inline
//! menu, and receive a transcoded MP3 with embedded artwork.
//!
//! ## Design Philosophy
//!
//! - **Session pipeline first** - the core is the search-select-download
//!   flow: per-conversation session state links a text search to a later
//!   button click, and the pipeline turns the selection into a finished
//!   audio artifact.
//! - **Scoped resources** - every download attempt owns a private temp
//!   directory that is reclaimed on every exit path, success or failure.
//! - **Graceful degradation** - provider errors become empty results, a
//!   missing encoder means raw-stream delivery, a failed artwork fetch
//!   means no artwork. Only failures with no safe fallback reach the user.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tunebot::{Config, TuneBot};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     TuneBot::new(config)?.run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Telegram bot wiring (dispatcher, handlers, delivery)
pub mod bot;
/// Configuration types
pub mod config;
/// External audio encoder
pub mod encoder;
/// Error types
pub mod error;
/// Download and transcode pipeline
pub mod pipeline;
/// Media search and stream resolution providers
pub mod provider;
/// Scoped temporary storage for downloads
pub mod scope;
/// Per-conversation session store
pub mod session;
/// Thumbnail fetching and normalization
pub mod thumbnail;
/// Core data types
pub mod types;
/// Utility functions
pub mod util;

// Re-export commonly used types
pub use bot::TuneBot;
pub use config::Config;
pub use error::{DeliveryError, DownloadError, Error, Result, SearchError, SessionError};
pub use pipeline::Pipeline;
pub use provider::{SearchProvider, StreamProvider, YtDlpProvider};
pub use scope::DownloadScope;
pub use session::SessionStore;
pub use types::{Candidate, DownloadBundle, ResolvedStream, StreamKind};
