//! Delivery adapter
//!
//! Uploads a finished [`DownloadBundle`] to its conversation and resolves
//! the "downloading" status message either way: deleted on success, edited
//! to an error on failure. This is the single point that releases the
//! bundle's resource scope, and it does so on every exit.

use crate::error::{DeliveryError, Result};
use crate::types::DownloadBundle;
use std::path::Path;
use teloxide::payloads::{EditMessageTextSetters, SendAudioSetters};
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode, ReplyParameters};
use tracing::{info, warn};

const ERR_SEND: &str = "❌ <b>Error sending file.</b> Please try again.";

/// Upload the bundle's audio (and artwork) to `chat_id`.
///
/// Consumes the bundle; its scope is released unconditionally after the
/// upload attempt, success or failure, so every file the pipeline staged is
/// gone by the time this returns.
pub async fn deliver(
    bot: &Bot,
    chat_id: ChatId,
    status_id: MessageId,
    reply_to: Option<MessageId>,
    bundle: DownloadBundle,
) -> Result<()> {
    let DownloadBundle {
        file_path,
        title,
        performer,
        duration_seconds,
        thumbnail_path,
        bitrate_label,
        scope,
    } = bundle;

    let send_result = send_audio(
        bot,
        chat_id,
        reply_to,
        &file_path,
        &title,
        &performer,
        duration_seconds,
        thumbnail_path.as_deref(),
    )
    .await;

    let outcome = match send_result {
        Ok(()) => {
            info!(
                conversation_id = chat_id.0,
                title = %title,
                bitrate = %bitrate_label,
                "delivered audio"
            );
            // The placeholder has served its purpose; a failure to remove it
            // is cosmetic.
            if let Err(e) = bot.delete_message(chat_id, status_id).await {
                warn!(conversation_id = chat_id.0, error = %e, "failed to remove status message");
            }
            Ok(())
        }
        Err(e) => {
            let _ = bot
                .edit_message_text(chat_id, status_id, ERR_SEND)
                .parse_mode(ParseMode::Html)
                .await;
            Err(DeliveryError::UploadFailed {
                conversation_id: chat_id.0,
                reason: e.to_string(),
            }
            .into())
        }
    };

    scope.release();
    outcome
}

#[allow(clippy::too_many_arguments)]
async fn send_audio(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
    file_path: &Path,
    title: &str,
    performer: &str,
    duration_seconds: u32,
    thumbnail_path: Option<&Path>,
) -> std::result::Result<(), teloxide::RequestError> {
    let mut request = bot
        .send_audio(chat_id, InputFile::file(file_path.to_path_buf()))
        .caption(format!("🎵 {} - {}", title, performer))
        .title(title.to_string())
        .performer(performer.to_string())
        .duration(duration_seconds);

    if let Some(thumb) = thumbnail_path {
        request = request.thumbnail(InputFile::file(thumb.to_path_buf()));
    }
    if let Some(reply_id) = reply_to {
        request = request.reply_parameters(ReplyParameters::new(reply_id));
    }

    request.await?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::scope::DownloadScope;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_REJECTION: &str =
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;

    fn rejecting_bot(server: &MockServer) -> Bot {
        let api_url = reqwest::Url::parse(&server.uri()).unwrap();
        Bot::new("123456:TESTTOKEN").set_api_url(api_url)
    }

    fn bundle_in(root: &Path) -> DownloadBundle {
        let scope = DownloadScope::create_in(root).unwrap();
        let file_path = scope.file("Blinding Lights.mp3");
        std::fs::write(&file_path, b"ID3\x04fake-stream-bytes").unwrap();
        DownloadBundle {
            file_path,
            title: "Blinding Lights".to_string(),
            performer: "The Weeknd".to_string(),
            duration_seconds: 202,
            thumbnail_path: None,
            bitrate_label: "320kbps".to_string(),
            scope,
        }
    }

    #[tokio::test]
    async fn failed_upload_reports_error_and_reclaims_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_raw(API_REJECTION, "application/json"),
            )
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let bundle = bundle_in(root.path());
        let scope_path = bundle.scope.path().to_path_buf();

        let err = deliver(&rejecting_bot(&server), ChatId(42), MessageId(7), None, bundle)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Delivery(DeliveryError::UploadFailed {
                conversation_id: 42,
                ..
            })
        ));
        assert!(!scope_path.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_upload_with_artwork_still_removes_every_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_raw(API_REJECTION, "application/json"),
            )
            .mount(&server)
            .await;

        let root = tempfile::tempdir().unwrap();
        let mut bundle = bundle_in(root.path());
        let thumb = bundle.scope.file("thumbnail.jpg");
        std::fs::write(&thumb, b"\xff\xd8fake-jpeg").unwrap();
        bundle.thumbnail_path = Some(thumb.clone());

        let result = deliver(
            &rejecting_bot(&server),
            ChatId(42),
            MessageId(7),
            Some(MessageId(3)),
            bundle,
        )
        .await;

        assert!(result.is_err());
        assert!(!thumb.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
