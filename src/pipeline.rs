//! Download, transcode, and bundle pipeline
//!
//! Turns a selected source id into a finished [`DownloadBundle`]:
//! resolve the best stream, stage it inside a fresh [`DownloadScope`],
//! transcode at the configured bitrate (or fall back to the raw stream when
//! the encoder is unavailable or fails), normalize the artwork, and hand the
//! scope to the bundle. Failures before a final file exists release the
//! scope before returning, so no temp directory ever outlives its attempt.

use crate::config::DownloadConfig;
use crate::encoder::Encoder;
use crate::error::{DownloadError, Result};
use crate::provider::StreamProvider;
use crate::scope::DownloadScope;
use crate::thumbnail;
use crate::types::DownloadBundle;
use crate::util::{normalize_performer, sanitize_filename};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The download-convert-deliver pipeline, minus delivery
pub struct Pipeline {
    provider: Arc<dyn StreamProvider>,
    encoder: Option<Encoder>,
    http: reqwest::Client,
    config: DownloadConfig,
}

impl Pipeline {
    /// Build a pipeline over a stream provider and an optional encoder
    pub fn new(
        provider: Arc<dyn StreamProvider>,
        encoder: Option<Encoder>,
        http: reqwest::Client,
        config: DownloadConfig,
    ) -> Self {
        Self {
            provider,
            encoder,
            http,
            config,
        }
    }

    /// Run the full pipeline for one selected source id.
    ///
    /// On success the returned bundle's `file_path` is a complete, playable
    /// audio file inside the bundle's scope. On failure the scope (if one
    /// was created) has already been removed.
    pub async fn download(&self, source_id: &str) -> Result<DownloadBundle> {
        // Stream resolution happens before any disk state exists.
        let stream = self.provider.resolve(source_id).await?;

        let scope = DownloadScope::create_in(&self.config.download_dir)?;

        // The dotted name keeps the staged file disjoint from every possible
        // final name: sanitized stems never start with a dot.
        let staged = scope.file(&format!(".staged.{}", stream.ext));
        if let Err(e) = self.provider.fetch(source_id, &stream, &staged).await {
            scope.release();
            return Err(e);
        }

        let final_name = format!("{}.mp3", sanitize_filename(&stream.title));
        let final_path = scope.file(&final_name);
        let bitrate_label = self.finalize_audio(&staged, &final_path).await?;

        let thumbnail_path = match &stream.thumbnail_url {
            Some(url) => thumbnail::fetch_normalized(&self.http, url, scope.path()).await,
            None => None,
        };

        info!(
            source_id,
            file = ?final_path,
            bitrate = %bitrate_label,
            has_artwork = thumbnail_path.is_some(),
            "pipeline completed"
        );

        Ok(DownloadBundle {
            file_path: final_path,
            title: stream.title.clone(),
            performer: normalize_performer(stream.uploader.as_deref()),
            duration_seconds: stream.duration_seconds,
            thumbnail_path,
            bitrate_label,
            scope,
        })
    }

    /// Produce the final audio file from the staged stream.
    ///
    /// Tries the external encoder first; on any encoder problem the staged
    /// original is renamed to the final path unmodified. Exactly one of the
    /// two paths must succeed, so a playable file always ends up at
    /// `final_path`. Returns the informational bitrate label.
    async fn finalize_audio(&self, staged: &Path, final_path: &Path) -> Result<String> {
        if let Some(encoder) = &self.encoder {
            match encoder
                .transcode(
                    staged,
                    final_path,
                    self.config.bitrate_kbps,
                    &self.config.comment_tag,
                )
                .await
            {
                Ok(()) if file_nonempty(final_path) => {
                    return Ok(format!("{}kbps", self.config.bitrate_kbps));
                }
                Ok(()) => {
                    warn!(?final_path, "encoder produced an empty file, using raw stream");
                }
                Err(e) => {
                    warn!(error = %e, "transcode failed, using raw stream");
                }
            }
            // A failed run may leave a partial output behind; the rename
            // below must land on a clean path.
            let _ = std::fs::remove_file(final_path);
        }

        tokio::fs::rename(staged, final_path)
            .await
            .map_err(|e| DownloadError::StageFailed {
                path: staged.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok("source quality".to_string())
    }
}

fn file_nonempty(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{ResolvedStream, StreamKind};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FAKE_AUDIO: &[u8] = b"ID3\x04fake-stream-bytes-for-tests";

    /// Test double that serves canned streams from memory
    struct FakeProvider {
        fail_resolve: bool,
        fail_fetch: bool,
        thumbnail_url: Option<String>,
        title: String,
        ext: String,
        seen_dest: std::sync::Mutex<Option<PathBuf>>,
    }

    impl FakeProvider {
        fn ok() -> Self {
            Self {
                fail_resolve: false,
                fail_fetch: false,
                thumbnail_url: None,
                title: "Blinding Lights".to_string(),
                ext: "webm".to_string(),
                seen_dest: std::sync::Mutex::new(None),
            }
        }

        fn stream(&self) -> ResolvedStream {
            ResolvedStream {
                format_id: "251".to_string(),
                kind: StreamKind::AudioOnly,
                ext: self.ext.clone(),
                abr: Some(160.0),
                title: self.title.clone(),
                uploader: Some("The Weeknd - Topic".to_string()),
                duration_seconds: 202,
                thumbnail_url: self.thumbnail_url.clone(),
            }
        }
    }

    #[async_trait]
    impl StreamProvider for FakeProvider {
        async fn resolve(&self, source_id: &str) -> Result<ResolvedStream> {
            if self.fail_resolve {
                return Err(DownloadError::NoStreamAvailable {
                    source_id: source_id.to_string(),
                }
                .into());
            }
            Ok(self.stream())
        }

        async fn fetch(
            &self,
            source_id: &str,
            _stream: &ResolvedStream,
            dest: &Path,
        ) -> Result<()> {
            if self.fail_fetch {
                return Err(DownloadError::FetchFailed {
                    source_id: source_id.to_string(),
                    reason: "simulated network failure".to_string(),
                }
                .into());
            }
            *self.seen_dest.lock().unwrap() = Some(dest.to_path_buf());
            std::fs::write(dest, FAKE_AUDIO)?;
            Ok(())
        }
    }

    fn pipeline_with(
        provider: FakeProvider,
        encoder: Option<Encoder>,
        download_dir: PathBuf,
    ) -> Pipeline {
        Pipeline::new(
            Arc::new(provider),
            encoder,
            reqwest::Client::new(),
            DownloadConfig {
                download_dir,
                ..Default::default()
            },
        )
    }

    fn scope_entries(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn resolve_failure_leaves_no_temp_directory() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            FakeProvider {
                fail_resolve: true,
                ..FakeProvider::ok()
            },
            None,
            root.path().to_path_buf(),
        );

        let err = pipeline.download("abc123").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::NoStreamAvailable { .. })
        ));
        assert_eq!(scope_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn fetch_failure_releases_the_scope() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            FakeProvider {
                fail_fetch: true,
                ..FakeProvider::ok()
            },
            None,
            root.path().to_path_buf(),
        );

        let err = pipeline.download("abc123").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Download(DownloadError::FetchFailed { .. })
        ));
        assert_eq!(scope_entries(root.path()), 0);
    }

    #[tokio::test]
    async fn without_encoder_raw_stream_is_delivered_byte_identical() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(FakeProvider::ok(), None, root.path().to_path_buf());

        let bundle = pipeline.download("abc123").await.unwrap();
        assert!(bundle.file_path.exists());
        assert_eq!(std::fs::read(&bundle.file_path).unwrap(), FAKE_AUDIO);
        assert_eq!(bundle.bitrate_label, "source quality");
        assert_eq!(bundle.performer, "The Weeknd");
        assert_eq!(bundle.duration_seconds, 202);
        assert!(bundle.thumbnail_path.is_none());
        assert_eq!(
            bundle.file_path.file_name().unwrap(),
            "Blinding Lights.mp3"
        );
    }

    #[tokio::test]
    async fn staged_path_stays_distinct_even_for_a_track_titled_source() {
        let root = tempfile::tempdir().unwrap();
        let provider = Arc::new(FakeProvider {
            title: "source".to_string(),
            ext: "mp3".to_string(),
            ..FakeProvider::ok()
        });
        let pipeline = Pipeline::new(
            provider.clone(),
            None,
            reqwest::Client::new(),
            DownloadConfig {
                download_dir: root.path().to_path_buf(),
                ..Default::default()
            },
        );

        let bundle = pipeline.download("abc123").await.unwrap();
        let staged = provider.seen_dest.lock().unwrap().clone().unwrap();
        assert_ne!(staged, bundle.file_path);
        assert_eq!(bundle.file_path.file_name().unwrap(), "source.mp3");
        assert_eq!(std::fs::read(&bundle.file_path).unwrap(), FAKE_AUDIO);
    }

    #[tokio::test]
    async fn broken_encoder_falls_back_to_raw_stream() {
        let root = tempfile::tempdir().unwrap();
        let encoder = Encoder::new(PathBuf::from("/nonexistent/ffmpeg-xyz"));
        let pipeline = pipeline_with(FakeProvider::ok(), Some(encoder), root.path().to_path_buf());

        let bundle = pipeline.download("abc123").await.unwrap();
        assert_eq!(std::fs::read(&bundle.file_path).unwrap(), FAKE_AUDIO);
        assert_eq!(bundle.bitrate_label, "source quality");
    }

    #[tokio::test]
    async fn thumbnail_404_omits_artwork_without_failing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thumb.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            FakeProvider {
                thumbnail_url: Some(format!("{}/thumb.jpg", server.uri())),
                ..FakeProvider::ok()
            },
            None,
            root.path().to_path_buf(),
        );

        let bundle = pipeline.download("abc123").await.unwrap();
        assert!(bundle.thumbnail_path.is_none());
        assert!(bundle.file_path.exists());
    }

    #[tokio::test]
    async fn thumbnail_success_lands_inside_the_scope() {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let mut png = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thumb.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png.into_inner()))
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            FakeProvider {
                thumbnail_url: Some(format!("{}/thumb.png", server.uri())),
                ..FakeProvider::ok()
            },
            None,
            root.path().to_path_buf(),
        );

        let bundle = pipeline.download("abc123").await.unwrap();
        let thumb = bundle.thumbnail_path.as_ref().unwrap();
        assert!(thumb.starts_with(bundle.scope.path()));
        assert!(thumb.exists());
    }

    #[tokio::test]
    async fn releasing_the_bundle_scope_removes_every_file() {
        let root = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(FakeProvider::ok(), None, root.path().to_path_buf());

        let bundle = pipeline.download("abc123").await.unwrap();
        let file = bundle.file_path.clone();
        bundle.scope.release();

        assert!(!file.exists());
        assert_eq!(scope_entries(root.path()), 0);
    }
}
