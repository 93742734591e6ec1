//! Thumbnail fetching and JPEG normalization
//!
//! Artwork comes from the provider in whatever format the CDN serves (webp,
//! png, jpeg). It is fetched over HTTP, decoded, converted to RGB, and
//! re-encoded as a high-quality JPEG inside the download scope so the
//! messaging platform always receives a format it accepts. Every failure
//! here is non-fatal: the track is delivered without artwork.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::path::{Path, PathBuf};
use tracing::warn;

/// JPEG quality for re-encoded artwork
const JPEG_QUALITY: u8 = 95;

/// Filename of the normalized artwork inside a download scope
const THUMBNAIL_NAME: &str = "thumbnail.jpg";

/// Fetch `url` and store it as a normalized JPEG inside `scope_dir`.
///
/// Returns the written path, or `None` when the fetch, decode, or encode
/// failed; the cause is logged and the caller proceeds without artwork.
pub async fn fetch_normalized(
    client: &reqwest::Client,
    url: &str,
    scope_dir: &Path,
) -> Option<PathBuf> {
    match try_fetch(client, url, scope_dir).await {
        Ok(path) => Some(path),
        Err(reason) => {
            warn!(url, %reason, "thumbnail unavailable, delivering without artwork");
            None
        }
    }
}

async fn try_fetch(
    client: &reqwest::Client,
    url: &str,
    scope_dir: &Path,
) -> std::result::Result<PathBuf, String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("request failed: {}", e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("unexpected status {}", status));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("body read failed: {}", e))?;

    let path = scope_dir.join(THUMBNAIL_NAME);
    encode_jpeg(&bytes, &path)?;
    Ok(path)
}

/// Decode arbitrary image bytes and write them as an RGB JPEG
fn encode_jpeg(bytes: &[u8], path: &Path) -> std::result::Result<(), String> {
    let image = image::load_from_memory(bytes).map_err(|e| format!("decode failed: {}", e))?;
    let rgb = image.to_rgb8();
    let file = std::fs::File::create(path).map_err(|e| format!("create failed: {}", e))?;
    let mut encoder = JpegEncoder::new_with_quality(file, JPEG_QUALITY);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("encode failed: {}", e))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 40, 40]));
        let mut out = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn fetch_reencodes_to_jpeg() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/art.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/art.png", server.uri());

        let written = fetch_normalized(&client, &url, dir.path()).await.unwrap();
        assert_eq!(written, dir.path().join("thumbnail.jpg"));

        let reloaded = image::open(&written).unwrap();
        assert_eq!(reloaded.width(), 4);
        assert_eq!(reloaded.height(), 4);
    }

    #[tokio::test]
    async fn http_404_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/missing.jpg", server.uri());

        assert!(fetch_normalized(&client, &url, dir.path()).await.is_none());
        assert!(!dir.path().join("thumbnail.jpg").exists());
    }

    #[tokio::test]
    async fn undecodable_body_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not an image".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/broken.jpg", server.uri());

        assert!(fetch_normalized(&client, &url, dir.path()).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        // Reserved TEST-NET address, nothing listens there.
        let result = fetch_normalized(&client, "http://192.0.2.1:9/art.jpg", dir.path()).await;
        assert!(result.is_none());
    }
}
