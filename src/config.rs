//! Configuration types for tunebot

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the Telegram bot token
const ENV_API_TOKEN: &str = "API_TOKEN";
/// Environment variable overriding the download directory
const ENV_DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";

/// Telegram credentials and platform settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token, issued by BotFather
    pub api_token: String,
}

/// Search behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum candidates returned per search (default: 6)
    #[serde(default = "default_search_limit")]
    pub limit: usize,

    /// Maximum characters of an inline menu button label (default: 60)
    #[serde(default = "default_menu_label_len")]
    pub menu_label_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: default_search_limit(),
            menu_label_len: default_menu_label_len(),
        }
    }
}

/// Download and transcode behavior (directories, bitrate, metadata)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory that hosts every per-download scope (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Target transcode bitrate in kbps (default: 320)
    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,

    /// Comment tag embedded in transcoded files (default: "tunebot")
    #[serde(default = "default_comment_tag")]
    pub comment_tag: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            bitrate_kbps: default_bitrate_kbps(),
            comment_tag: default_comment_tag(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
///
/// Explicit paths win; otherwise binaries are discovered on PATH when
/// `search_path` is enabled. A missing ffmpeg is not an error: the pipeline
/// falls back to delivering the raw fetched stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to the ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Timeouts applied to outbound network and subprocess calls
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Provider subprocess timeout in seconds (default: 180)
    #[serde(default = "default_subprocess_timeout_secs")]
    pub subprocess_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout_secs(),
            subprocess_timeout_secs: default_subprocess_timeout_secs(),
        }
    }
}

impl NetworkConfig {
    /// HTTP timeout as a [`Duration`]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Subprocess timeout as a [`Duration`]
    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_timeout_secs)
    }
}

/// Top-level configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Telegram credentials
    pub telegram: TelegramConfig,

    /// Search behavior
    #[serde(default)]
    pub search: SearchConfig,

    /// Download and transcode behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Network and subprocess timeouts
    #[serde(default)]
    pub network: NetworkConfig,
}

impl Config {
    /// Build a configuration from the process environment.
    ///
    /// `API_TOKEN` is required; `DOWNLOAD_DIR` optionally overrides the
    /// download directory. Everything else takes its default.
    pub fn from_env() -> Result<Self> {
        let api_token = std::env::var(ENV_API_TOKEN).map_err(|_| Error::Config {
            message: format!("{} is not set", ENV_API_TOKEN),
            key: Some(ENV_API_TOKEN.to_string()),
        })?;
        if api_token.trim().is_empty() {
            return Err(Error::Config {
                message: format!("{} is empty", ENV_API_TOKEN),
                key: Some(ENV_API_TOKEN.to_string()),
            });
        }

        let mut download = DownloadConfig::default();
        if let Ok(dir) = std::env::var(ENV_DOWNLOAD_DIR) {
            if !dir.trim().is_empty() {
                download.download_dir = PathBuf::from(dir);
            }
        }

        Ok(Self {
            telegram: TelegramConfig { api_token },
            search: SearchConfig::default(),
            download,
            tools: ToolsConfig::default(),
            network: NetworkConfig::default(),
        })
    }
}

fn default_search_limit() -> usize {
    6
}

fn default_menu_label_len() -> usize {
    60
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_bitrate_kbps() -> u32 {
    320
}

fn default_comment_tag() -> String {
    "tunebot".to_string()
}

fn default_true() -> bool {
    true
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_subprocess_timeout_secs() -> u64 {
    180
}
