//! Core types for the search-select-download flow

use crate::scope::DownloadScope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prefix used for selection callback payloads (`song_<index>`)
const SELECTION_PREFIX: &str = "song_";

/// One search result representing a playable track.
///
/// Candidates are created by the media resolver, held collectively by one
/// session entry, and discarded when that entry is overwritten. The `index`
/// is the candidate's 1-based rank within its own search response; indexes
/// are reused across searches and are only meaningful against the entry they
/// were stored with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// 1-based rank within the search response, as a string ("1".."n")
    pub index: String,
    /// Track title as reported by the provider
    pub title: String,
    /// Channel/uploader display name
    pub artist: String,
    /// Human-readable duration ("3:42"); opaque, display only
    pub duration: String,
    /// Opaque identifier into the external provider
    pub source_id: String,
    /// Thumbnail image URL
    pub thumbnail_url: String,
}

impl Candidate {
    /// Callback payload that selects this candidate from an inline menu
    pub fn callback_payload(&self) -> String {
        format!("{}{}", SELECTION_PREFIX, self.index)
    }

    /// Inline menu label, truncated to `max_len` characters
    ///
    /// Renders `"{title} - {artist} [{duration}]"` and shortens overlong
    /// labels with a `...` suffix so they fit a single keyboard row.
    pub fn menu_label(&self, max_len: usize) -> String {
        let label = format!("{} - {} [{}]", self.title, self.artist, self.duration);
        if label.chars().count() <= max_len {
            return label;
        }
        let truncated: String = label.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Parse a selection callback payload back into its index string
///
/// Returns `None` for payloads that do not carry a selection (wrong prefix,
/// empty index).
pub fn parse_selection_payload(payload: &str) -> Option<&str> {
    let index = payload.strip_prefix(SELECTION_PREFIX)?;
    if index.is_empty() {
        return None;
    }
    Some(index)
}

/// Whether a callback payload is selection-shaped (carries the selection
/// prefix), regardless of whether its index is usable
pub fn is_selection_payload(payload: &str) -> bool {
    payload.starts_with(SELECTION_PREFIX)
}

/// Kind of stream chosen by the resolver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Audio-only stream, ranked by audio bitrate
    AudioOnly,
    /// Progressive (audio+video) stream, ranked by resolution; used only
    /// when no audio-only stream exists
    Progressive,
}

/// One downloadable stream resolved for a source id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStream {
    /// Provider-side format identifier, passed back verbatim when fetching
    pub format_id: String,
    /// Whether this is an audio-only or progressive stream
    pub kind: StreamKind,
    /// Container extension of the stream ("m4a", "webm", "mp4")
    pub ext: String,
    /// Audio bitrate in kbps, when the provider reports one
    pub abr: Option<f64>,
    /// Track title
    pub title: String,
    /// Uploader display name, not yet normalized
    pub uploader: Option<String>,
    /// Track duration in whole seconds
    pub duration_seconds: u32,
    /// Thumbnail URL, when the provider reports one
    pub thumbnail_url: Option<String>,
}

/// Result of a completed download pipeline run.
///
/// The bundle owns the [`DownloadScope`] backing its files; releasing the
/// scope (or dropping the bundle) deletes every staged file in one
/// operation. `file_path` always points at a playable audio file: either the
/// transcoded output or the untouched original, never a half-written file.
#[derive(Debug)]
pub struct DownloadBundle {
    /// Finished audio artifact, inside the scope
    pub file_path: PathBuf,
    /// Track title
    pub title: String,
    /// Normalized artist name ("Unknown" when the provider has none)
    pub performer: String,
    /// Track duration in whole seconds
    pub duration_seconds: u32,
    /// Re-encoded JPEG artwork, when the thumbnail fetch succeeded
    pub thumbnail_path: Option<PathBuf>,
    /// Informational bitrate label ("320kbps")
    pub bitrate_label: String,
    /// Scope owning every file this bundle references
    pub scope: DownloadScope,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: &str) -> Candidate {
        Candidate {
            index: index.to_string(),
            title: "Blinding Lights".to_string(),
            artist: "The Weeknd".to_string(),
            duration: "3:22".to_string(),
            source_id: "abc123".to_string(),
            thumbnail_url: "https://example.com/thumb.jpg".to_string(),
        }
    }

    #[test]
    fn callback_payload_round_trips() {
        let c = candidate("2");
        let payload = c.callback_payload();
        assert_eq!(payload, "song_2");
        assert_eq!(parse_selection_payload(&payload), Some("2"));
    }

    #[test]
    fn parse_rejects_foreign_payloads() {
        assert_eq!(parse_selection_payload("approve_2"), None);
        assert_eq!(parse_selection_payload("song_"), None);
        assert_eq!(parse_selection_payload(""), None);
    }

    #[test]
    fn selection_shape_is_detected_independently_of_index() {
        assert!(is_selection_payload("song_2"));
        assert!(is_selection_payload("song_"));
        assert!(!is_selection_payload("approve_2"));
        assert!(!is_selection_payload(""));
    }

    #[test]
    fn menu_label_short_is_untruncated() {
        let c = candidate("1");
        assert_eq!(c.menu_label(60), "Blinding Lights - The Weeknd [3:22]");
    }

    #[test]
    fn menu_label_long_is_truncated_with_ellipsis() {
        let mut c = candidate("1");
        c.title = "A".repeat(80);
        let label = c.menu_label(60);
        assert_eq!(label.chars().count(), 60);
        assert!(label.ends_with("..."));
    }
}
