//! Slash command definitions and static replies

use teloxide::prelude::*;
use teloxide::payloads::SendMessageSetters;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

/// Commands the bot understands; any other text is treated as a search query
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Welcome message
    Start,
    /// Usage help
    Help,
    /// About this bot
    About,
}

const WELCOME_MSG: &str = "\
👋 <b>Welcome to TuneBot!</b>\n\
\n\
✨ <b>Features:</b>\n\
• Type any song name (e.g. <b>Blinding Lights</b>)\n\
• High quality MP3 downloads (320kbps)\n\
• Tracks include album artwork thumbnails\n\
• Search handles typos and partial names\n\
\n\
Simply send a song name to get started!";

const HELP_MSG: &str = "\
<b>TuneBot Commands &amp; Tips</b>\n\
\n\
• /start - Welcome message\n\
• /help - Display this help info\n\
• /about - About this bot\n\
• Send any song name to search\n\
\n\
<b>Pro Tips:</b>\n\
• Include the artist name for better results\n\
• High quality audio (320kbps)\n\
• Music includes album art thumbnails\n\
\n\
Example: <code>Blinding Lights The Weeknd</code>";

const ABOUT_MSG: &str = "\
🎵 <b>TuneBot</b> 🎵\n\
\n\
A music downloader bot that delivers high quality MP3s (320kbps) with album \
artwork directly to your chat.\n\
\n\
<b>Version:</b> 0.2.0";

/// Reply to a slash command with its static text
pub async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => WELCOME_MSG,
        Command::Help => HELP_MSG,
        Command::About => ABOUT_MSG,
    };
    bot.send_message(msg.chat.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_case_insensitively_on_name() {
        assert_eq!(Command::parse("/start", "tunebot").unwrap(), Command::Start);
        assert_eq!(Command::parse("/help", "tunebot").unwrap(), Command::Help);
        assert_eq!(Command::parse("/about", "tunebot").unwrap(), Command::About);
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert!(Command::parse("Blinding Lights", "tunebot").is_err());
    }
}
