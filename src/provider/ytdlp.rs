//! yt-dlp backed provider implementation
//!
//! Search uses `ytsearchN:` with flat-playlist JSON lines; stream resolution
//! uses the full `-J` metadata dump and picks a format locally; fetching
//! hands the chosen format id back to yt-dlp. Every invocation is bounded by
//! the configured subprocess timeout.

use super::{SearchProvider, StreamProvider};
use crate::config::{NetworkConfig, ToolsConfig};
use crate::error::{DownloadError, Error, Result, SearchError};
use crate::types::{Candidate, ResolvedStream, StreamKind};
use crate::util::format_duration;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Name of the provider binary searched for on PATH
const YTDLP_BINARY: &str = "yt-dlp";

/// Provider backed by the external `yt-dlp` binary
pub struct YtDlpProvider {
    binary_path: PathBuf,
    timeout: Duration,
}

impl YtDlpProvider {
    /// Create a provider from tool and network configuration.
    ///
    /// Uses the explicit `ytdlp_path` when set, otherwise discovers the
    /// binary on PATH. Fails when no binary can be located: unlike the
    /// encoder there is no degraded mode without the provider.
    pub fn from_config(tools: &ToolsConfig, network: &NetworkConfig) -> Result<Self> {
        let binary_path = match &tools.ytdlp_path {
            Some(path) => path.clone(),
            None if tools.search_path => {
                which::which(YTDLP_BINARY).map_err(|e| Error::Config {
                    message: format!("{} not found on PATH: {}", YTDLP_BINARY, e),
                    key: Some("tools.ytdlp_path".to_string()),
                })?
            }
            None => {
                return Err(Error::Config {
                    message: format!(
                        "no {} path configured and PATH search is disabled",
                        YTDLP_BINARY
                    ),
                    key: Some("tools.ytdlp_path".to_string()),
                });
            }
        };
        info!(path = ?binary_path, "using media provider binary");
        Ok(Self {
            binary_path,
            timeout: network.subprocess_timeout(),
        })
    }

    /// Run the binary with `args`, enforcing the subprocess timeout.
    ///
    /// Returns captured stdout on success; a non-zero exit is reported with
    /// a stderr excerpt.
    async fn run(&self, args: &[&str]) -> std::result::Result<String, String> {
        debug!(args = ?args, "invoking yt-dlp");
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.binary_path)
                .args(args)
                .stdin(Stdio::null())
                .output(),
        )
        .await
        .map_err(|_| format!("timed out after {}s", self.timeout.as_secs()))?
        .map_err(|e| format!("failed to spawn {}: {}", YTDLP_BINARY, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.chars().take(500).collect();
            return Err(format!("exited with {}: {}", output.status, excerpt));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn watch_url(source_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", source_id)
    }
}

#[async_trait]
impl SearchProvider for YtDlpProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let target = format!("ytsearch{}:{}", limit, query);
        let stdout = self
            .run(&[
                &target,
                "--dump-json",
                "--flat-playlist",
                "--skip-download",
                "--no-warnings",
            ])
            .await
            .map_err(SearchError::Provider)?;

        let candidates = parse_search_output(&stdout, limit)?;
        info!(query, count = candidates.len(), "search completed");
        Ok(candidates)
    }
}

#[async_trait]
impl StreamProvider for YtDlpProvider {
    async fn resolve(&self, source_id: &str) -> Result<ResolvedStream> {
        let url = Self::watch_url(source_id);
        let stdout = self
            .run(&["-J", "--no-playlist", "--no-warnings", &url])
            .await
            .map_err(|reason| DownloadError::ResolveFailed {
                source_id: source_id.to_string(),
                reason,
            })?;

        let info: VideoInfo =
            serde_json::from_str(&stdout).map_err(|e| DownloadError::ResolveFailed {
                source_id: source_id.to_string(),
                reason: format!("unparseable metadata: {}", e),
            })?;

        let stream = select_stream(&info).ok_or_else(|| DownloadError::NoStreamAvailable {
            source_id: source_id.to_string(),
        })?;
        debug!(
            source_id,
            format_id = %stream.format_id,
            kind = ?stream.kind,
            abr = ?stream.abr,
            "resolved stream"
        );
        Ok(stream)
    }

    async fn fetch(&self, source_id: &str, stream: &ResolvedStream, dest: &Path) -> Result<()> {
        let url = Self::watch_url(source_id);
        let dest_str = dest.to_string_lossy().into_owned();
        self.run(&[
            "-f",
            &stream.format_id,
            "--no-playlist",
            "--no-warnings",
            "--no-part",
            "-o",
            &dest_str,
            &url,
        ])
        .await
        .map_err(|reason| DownloadError::FetchFailed {
            source_id: source_id.to_string(),
            reason,
        })?;

        if !dest.exists() {
            return Err(DownloadError::FetchFailed {
                source_id: source_id.to_string(),
                reason: format!("no file produced at {}", dest.display()),
            }
            .into());
        }
        Ok(())
    }
}

/// One line of `--flat-playlist --dump-json` search output
#[derive(Debug, Deserialize)]
struct SearchEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnails: Vec<ThumbnailEntry>,
}

#[derive(Debug, Deserialize)]
struct ThumbnailEntry {
    url: String,
}

/// Full `-J` metadata dump for one video
#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    format_id: String,
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    abr: Option<f64>,
    #[serde(default)]
    height: Option<f64>,
}

impl FormatEntry {
    fn has_audio(&self) -> bool {
        matches!(self.acodec.as_deref(), Some(c) if c != "none")
    }

    fn has_video(&self) -> bool {
        matches!(self.vcodec.as_deref(), Some(c) if c != "none")
    }
}

/// Parse newline-delimited search entries into ranked candidates.
///
/// Individual lines that fail to parse are skipped with a warning; indexes
/// stay contiguous over the entries that survive. When the provider printed
/// output but not a single entry parsed, the response as a whole is treated
/// as malformed.
fn parse_search_output(stdout: &str, limit: usize) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    let mut saw_content = false;
    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        saw_content = true;
        let entry: SearchEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unparseable search entry");
                continue;
            }
        };
        if candidates.len() >= limit {
            break;
        }
        candidates.push(candidate_from_entry(entry, candidates.len() + 1));
    }
    if saw_content && candidates.is_empty() {
        return Err(SearchError::MalformedResponse(
            "no parseable entries in provider output".to_string(),
        )
        .into());
    }
    Ok(candidates)
}

fn candidate_from_entry(entry: SearchEntry, rank: usize) -> Candidate {
    let artist = entry
        .channel
        .or(entry.uploader)
        .unwrap_or_else(|| "Unknown".to_string());
    let duration = entry
        .duration
        .map(|secs| format_duration(secs.round() as u32))
        .unwrap_or_else(|| "?:??".to_string());
    let thumbnail_url = entry
        .thumbnails
        .first()
        .map(|t| t.url.clone())
        .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", entry.id));
    Candidate {
        index: rank.to_string(),
        title: entry.title.unwrap_or_else(|| "Untitled".to_string()),
        artist,
        duration,
        source_id: entry.id,
        thumbnail_url,
    }
}

/// Pick the stream to download from a metadata dump.
///
/// Highest-bitrate audio-only format first; the progressive branch is only
/// consulted when the source has no audio-only formats at all, so it is a
/// genuine fallback rather than dead code.
fn select_stream(info: &VideoInfo) -> Option<ResolvedStream> {
    let audio_only = info
        .formats
        .iter()
        .filter(|f| f.has_audio() && !f.has_video())
        .max_by(|a, b| {
            a.abr
                .unwrap_or(0.0)
                .total_cmp(&b.abr.unwrap_or(0.0))
        });

    let (format, kind) = match audio_only {
        Some(f) => (f, StreamKind::AudioOnly),
        None => {
            let progressive = info
                .formats
                .iter()
                .filter(|f| f.has_audio() && f.has_video())
                .max_by(|a, b| {
                    a.height
                        .unwrap_or(0.0)
                        .total_cmp(&b.height.unwrap_or(0.0))
                })?;
            (progressive, StreamKind::Progressive)
        }
    };

    Some(ResolvedStream {
        format_id: format.format_id.clone(),
        kind,
        ext: format.ext.clone().unwrap_or_else(|| "m4a".to_string()),
        abr: format.abr,
        title: info.title.clone().unwrap_or_else(|| "Untitled".to_string()),
        uploader: info.channel.clone().or_else(|| info.uploader.clone()),
        duration_seconds: info.duration.map(|d| d.round() as u32).unwrap_or(0),
        thumbnail_url: info.thumbnail.clone(),
    })
}
