//! External fixed-bitrate audio encoder
//!
//! Wraps an ffmpeg invocation that re-encodes the staged stream at the
//! configured bitrate and embeds a comment tag. The encoder is strictly
//! optional: a missing binary or a failed invocation is reported as
//! [`DownloadError::EncodeFailed`] and the pipeline delivers the raw stream
//! instead.

use crate::config::ToolsConfig;
use crate::error::{DownloadError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Name of the encoder binary searched for on PATH
const FFMPEG_BINARY: &str = "ffmpeg";

/// Fixed-bitrate audio encoder backed by an external ffmpeg binary
pub struct Encoder {
    binary_path: PathBuf,
}

impl Encoder {
    /// Create an encoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Locate the encoder from configuration.
    ///
    /// Explicit `ffmpeg_path` wins; otherwise PATH is searched when enabled.
    /// `None` means no encoder is available on this host, which the pipeline
    /// treats as "always fall back".
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        if let Some(path) = &tools.ffmpeg_path {
            return Some(Self::new(path.clone()));
        }
        if !tools.search_path {
            return None;
        }
        match which::which(FFMPEG_BINARY) {
            Ok(path) => {
                info!(?path, "using audio encoder binary");
                Some(Self::new(path))
            }
            Err(e) => {
                info!(error = %e, "no encoder on PATH, raw streams will be delivered as-is");
                None
            }
        }
    }

    /// Transcode `input` to `output` at `bitrate_kbps`, embedding `comment`.
    ///
    /// Overwrites any existing file at `output`. A spawn failure or non-zero
    /// exit is reported as [`DownloadError::EncodeFailed`] with a stderr
    /// excerpt; on success `output` is a complete encoded file.
    pub async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        bitrate_kbps: u32,
        comment: &str,
    ) -> Result<()> {
        let bitrate = format!("{}k", bitrate_kbps);
        let metadata = format!("comment={}", comment);
        debug!(?input, ?output, bitrate = %bitrate, "starting transcode");

        let result = Command::new(&self.binary_path)
            .arg("-i")
            .arg(input)
            .args(["-b:a", &bitrate, "-metadata", &metadata, "-y"])
            .arg(output)
            .stdin(Stdio::null())
            .output()
            .await;

        let output_result = result.map_err(|e| DownloadError::EncodeFailed {
            input: input.to_path_buf(),
            reason: format!("failed to spawn {}: {}", FFMPEG_BINARY, e),
        })?;

        if !output_result.status.success() {
            let stderr = String::from_utf8_lossy(&output_result.stderr);
            let excerpt: String = stderr.chars().take(500).collect();
            return Err(DownloadError::EncodeFailed {
                input: input.to_path_buf(),
                reason: format!("exited with {}: {}", output_result.status, excerpt),
            }
            .into());
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn explicit_path_wins_over_path_search() {
        let tools = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/opt/custom/ffmpeg")),
            ..Default::default()
        };
        let encoder = Encoder::from_config(&tools).unwrap();
        assert_eq!(encoder.binary_path, PathBuf::from("/opt/custom/ffmpeg"));
    }

    #[test]
    fn disabled_path_search_means_no_encoder() {
        let tools = ToolsConfig {
            ffmpeg_path: None,
            search_path: false,
            ..Default::default()
        };
        assert!(Encoder::from_config(&tools).is_none());
    }

    #[tokio::test]
    async fn missing_binary_reports_encode_failed() {
        let encoder = Encoder::new(PathBuf::from("/nonexistent/ffmpeg-xyz"));
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in.m4a");
        std::fs::write(&input, b"not really audio").unwrap();
        let output = tmp.path().join("out.mp3");

        let err = encoder
            .transcode(&input, &output, 320, "tunebot")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::EncodeFailed { .. })
        ));
        assert!(!output.exists());
    }
}
