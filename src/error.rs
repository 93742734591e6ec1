//! Error types for tunebot
//!
//! This module provides the error handling for the crate, including:
//! - Domain-specific error types (Search, Session, Download, Delivery)
//! - Context information (source id, file path, selection index, etc.)
//!
//! Recoverable failures (provider errors, encoder failures, thumbnail
//! failures) are handled locally where a safe fallback exists and never
//! surface through these types to the user; see the pipeline module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tunebot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tunebot
///
/// This is the primary error type used throughout the crate. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api_token")
        key: Option<String>,
    },

    /// Search provider error
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Session lookup error (expired entry, unknown selection)
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Download pipeline error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Delivery (upload) error
    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Telegram API error
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Search provider errors
///
/// The media resolver degrades all of these to an empty candidate list for
/// the user-facing flow, but keeps them distinct so callers can tell a
/// transient provider failure apart from a genuinely empty result.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The search subprocess could not be spawned or exited non-zero
    #[error("search provider failed: {0}")]
    Provider(String),

    /// The provider returned output that could not be parsed
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

/// Session store lookup errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// No candidate list is stored for the conversation (never searched, or
    /// the process restarted since the menu was rendered)
    #[error("no active session for conversation {conversation_id}")]
    Expired {
        /// The conversation whose session was missing
        conversation_id: i64,
    },

    /// The selected index is not present in the conversation's current entry
    #[error("selection {index} not found for conversation {conversation_id}")]
    SelectionNotFound {
        /// The conversation whose entry was consulted
        conversation_id: i64,
        /// The 1-based index string that did not match any candidate
        index: String,
    },
}

/// Download pipeline errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The resolver found no audio-only and no progressive stream
    #[error("no playable stream available for {source_id}")]
    NoStreamAvailable {
        /// The provider identifier that had no usable streams
        source_id: String,
    },

    /// Stream metadata could not be resolved
    #[error("failed to resolve streams for {source_id}: {reason}")]
    ResolveFailed {
        /// The provider identifier being resolved
        source_id: String,
        /// The reason resolution failed
        reason: String,
    },

    /// The chosen stream could not be fetched to disk
    #[error("failed to fetch stream {source_id}: {reason}")]
    FetchFailed {
        /// The provider identifier being fetched
        source_id: String,
        /// The reason the fetch failed
        reason: String,
    },

    /// The staged file could not be moved to its final path
    #[error("failed to stage {path}: {reason}")]
    StageFailed {
        /// The staged file that could not be finalized
        path: PathBuf,
        /// The reason the move failed
        reason: String,
    },

    /// The external encoder failed or is unavailable
    ///
    /// Never surfaced to the user: the pipeline falls back to the raw
    /// fetched stream when it sees this.
    #[error("encode failed for {input}: {reason}")]
    EncodeFailed {
        /// The input file the encoder was given
        input: PathBuf,
        /// The reason the encode failed
        reason: String,
    },
}

/// Delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The platform rejected or failed the audio upload
    #[error("audio upload failed for conversation {conversation_id}: {reason}")]
    UploadFailed {
        /// The conversation the upload was addressed to
        conversation_id: i64,
        /// The reason the upload failed
        reason: String,
    },
}
