//! Media search and stream resolution
//!
//! This module provides a trait-based architecture for talking to the
//! external media provider. The two seams are [`SearchProvider`] (free-text
//! query to ranked candidates) and [`StreamProvider`] (source id to a chosen
//! stream, and that stream to a file on disk). The production implementation
//! is [`YtDlpProvider`], which drives the `yt-dlp` binary; tests substitute
//! their own implementations.

mod ytdlp;

pub use ytdlp::YtDlpProvider;

use crate::error::Result;
use crate::types::{Candidate, ResolvedStream};
use async_trait::async_trait;
use std::path::Path;

/// Free-text search against the external media provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for tracks matching `query`.
    ///
    /// Returns 0..`limit` candidates in provider-ranked order, with `index`
    /// assigned "1".."n" by rank. Errors describe provider failures; the
    /// user-facing flow degrades them to an empty result after logging.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;
}

/// Stream resolution and fetching for a selected source id
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Resolve the best stream for `source_id`.
    ///
    /// Picks the highest-bitrate audio-only stream; when the source has no
    /// audio-only streams at all, falls back to the highest-resolution
    /// progressive stream. Fails with `NoStreamAvailable` when neither
    /// exists.
    async fn resolve(&self, source_id: &str) -> Result<ResolvedStream>;

    /// Download `stream` to exactly `dest`.
    ///
    /// The caller picks a staged destination inside its own scope; on return
    /// the file at `dest` is complete.
    async fn fetch(&self, source_id: &str, stream: &ResolvedStream, dest: &Path) -> Result<()>;
}
