//! Message and callback handlers
//!
//! The text handler owns the search half of the flow: status placeholder,
//! provider search, session store write, inline menu render. The callback
//! handler owns the selection half: payload parse, session lookup, and
//! spawning the detached download+delivery task so the dispatcher stays
//! free for other conversations while a download is in flight.

use super::delivery;
use super::BotState;
use crate::error::{Error, SessionError};
use crate::types::{is_selection_payload, parse_selection_payload, Candidate};
use std::sync::Arc;
use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageTextSetters, SendMessageSetters};
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::{error, info, warn};

const STATUS_SEARCHING: &str = "🎵 <b>Finding your music...</b>";
const STATUS_SELECT: &str = "🎵 <b>Select a song to download:</b>";
const STATUS_DOWNLOADING: &str = "⬇️ <b>Downloading...</b> This can take a moment.";
const ERR_NO_RESULTS: &str = "❌ No results found. Try another song name.";
const ERR_SEARCH: &str = "❌ Search error. Please try again later.";
const ERR_DOWNLOAD: &str = "❌ <b>Download failed.</b> Please try another song.";
const ERR_SESSION_EXPIRED: &str = "Session expired. Please search again.";
const ERR_SELECTION_GONE: &str = "Song not found. Please search again.";

/// Handle a free-text message as a search query
pub async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let query = text.trim();
    if query.is_empty() {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    info!(conversation_id = chat_id.0, query, "searching");

    let status = bot
        .send_message(chat_id, STATUS_SEARCHING)
        .parse_mode(ParseMode::Html)
        .await?;

    let candidates = match state
        .search
        .search(query, state.search_config.limit)
        .await
    {
        Ok(candidates) => candidates,
        Err(e) => {
            // Degrade-to-empty policy: provider failures are logged, the
            // user just sees a retryable failure text.
            error!(conversation_id = chat_id.0, error = %e, "search failed");
            bot.edit_message_text(chat_id, status.id, ERR_SEARCH).await?;
            return Ok(());
        }
    };

    if candidates.is_empty() {
        bot.edit_message_text(chat_id, status.id, ERR_NO_RESULTS)
            .await?;
        return Ok(());
    }

    let keyboard = selection_keyboard(&candidates, state.search_config.menu_label_len);
    state.sessions.put(chat_id.0, candidates).await;

    bot.edit_message_text(chat_id, status.id, STATUS_SELECT)
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

/// Handle an inline menu button press
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let data = q.data.as_deref().unwrap_or_default();
    let Some(index) = parse_selection_payload(data) else {
        if malformed_selection(data) {
            // Selection-shaped but unusable, likely a stale or truncated
            // menu; tell the user to search again.
            bot.answer_callback_query(q.id)
                .text(ERR_SESSION_EXPIRED)
                .await?;
        } else {
            // Foreign payload; just clear the spinner.
            bot.answer_callback_query(q.id).await?;
        }
        return Ok(());
    };
    let index = index.to_string();

    let Some(message) = q.regular_message().cloned() else {
        bot.answer_callback_query(q.id)
            .text(ERR_SESSION_EXPIRED)
            .await?;
        return Ok(());
    };
    let chat_id = message.chat.id;

    let candidate = match state.sessions.find_by_index(chat_id.0, &index).await {
        Ok(candidate) => candidate,
        Err(Error::Session(SessionError::Expired { .. })) => {
            bot.answer_callback_query(q.id)
                .text(ERR_SESSION_EXPIRED)
                .await?;
            return Ok(());
        }
        Err(e) => {
            warn!(conversation_id = chat_id.0, index, error = %e, "stale selection");
            bot.answer_callback_query(q.id)
                .text(ERR_SELECTION_GONE)
                .await?;
            return Ok(());
        }
    };

    bot.answer_callback_query(q.id).await?;

    let status_id = message.id;
    bot.edit_message_text(chat_id, status_id, STATUS_DOWNLOADING)
        .parse_mode(ParseMode::Html)
        .await?;

    let reply_to = message.reply_to_message().map(|m| m.id);

    // Detached task: the dispatcher keeps serving other events while this
    // download runs. The task owns the pipeline scope end to end.
    tokio::spawn(download_and_deliver(
        bot,
        state,
        chat_id,
        status_id,
        reply_to,
        candidate,
    ));
    Ok(())
}

/// Run the pipeline for a selected candidate and deliver the result.
///
/// Lives on its own task; every exit path either had no scope (pipeline
/// failure cleans up internally) or releases it through delivery.
async fn download_and_deliver(
    bot: Bot,
    state: Arc<BotState>,
    chat_id: ChatId,
    status_id: MessageId,
    reply_to: Option<MessageId>,
    candidate: Candidate,
) {
    info!(
        conversation_id = chat_id.0,
        source_id = %candidate.source_id,
        title = %candidate.title,
        "starting download"
    );

    let bundle = match state.pipeline.download(&candidate.source_id).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(
                conversation_id = chat_id.0,
                source_id = %candidate.source_id,
                error = %e,
                "download failed"
            );
            let _ = bot
                .edit_message_text(chat_id, status_id, ERR_DOWNLOAD)
                .parse_mode(ParseMode::Html)
                .await;
            return;
        }
    };

    if let Err(e) = delivery::deliver(&bot, chat_id, status_id, reply_to, bundle).await {
        error!(conversation_id = chat_id.0, error = %e, "delivery failed");
    }
}

/// A payload that carries the selection prefix but no usable index
fn malformed_selection(data: &str) -> bool {
    is_selection_payload(data) && parse_selection_payload(data).is_none()
}

/// One button per row, labeled `"{title} - {artist} [{duration}]"`
fn selection_keyboard(candidates: &[Candidate], max_label_len: usize) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = candidates
        .iter()
        .map(|c| {
            vec![InlineKeyboardButton::callback(
                c.menu_label(max_label_len),
                c.callback_payload(),
            )]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}
