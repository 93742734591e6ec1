//! Telegram bot wiring
//!
//! Builds the dispatcher over three update branches (slash commands, text
//! searches, inline selections) and holds the shared state every handler
//! needs: the session store, the search provider, and the download
//! pipeline. Each inbound update is an independent task; downloads detach
//! further so long transfers never block the dispatcher.

mod commands;
mod delivery;
mod handler;

pub use commands::Command;

use crate::config::{Config, SearchConfig};
use crate::encoder::Encoder;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::provider::{SearchProvider, StreamProvider, YtDlpProvider};
use crate::session::SessionStore;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::info;

/// State shared by every handler invocation
pub(crate) struct BotState {
    pub(crate) sessions: SessionStore,
    pub(crate) search: Arc<dyn SearchProvider>,
    pub(crate) pipeline: Pipeline,
    pub(crate) search_config: SearchConfig,
}

/// The assembled bot, ready to poll for updates
pub struct TuneBot {
    bot: Bot,
    state: Arc<BotState>,
}

impl TuneBot {
    /// Wire up the bot from configuration.
    ///
    /// Fails when the Telegram client or the media provider cannot be
    /// constructed; a missing encoder is tolerated (raw-stream fallback).
    pub fn new(config: Config) -> Result<Self> {
        let bot = Bot::new(&config.telegram.api_token);

        let http = reqwest::Client::builder()
            .timeout(config.network.http_timeout())
            .build()?;

        let provider = Arc::new(YtDlpProvider::from_config(&config.tools, &config.network)?);
        let encoder = Encoder::from_config(&config.tools);
        let pipeline = Pipeline::new(
            provider.clone() as Arc<dyn StreamProvider>,
            encoder,
            http,
            config.download.clone(),
        );

        let state = Arc::new(BotState {
            sessions: SessionStore::new(),
            search: provider as Arc<dyn SearchProvider>,
            pipeline,
            search_config: config.search.clone(),
        });

        Ok(Self { bot, state })
    }

    /// Poll for updates until the process is terminated
    pub async fn run(self) -> Result<()> {
        let me = self.bot.get_me().await?;
        info!(username = me.username(), "bot started");

        let handler = dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(commands::handle_command),
            )
            .branch(Update::filter_message().endpoint(handler::handle_message))
            .branch(Update::filter_callback_query().endpoint(handler::handle_callback));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.state])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}
