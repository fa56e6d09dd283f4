//! The teloxide client wrapper. One fresh bot per call, dropped afterwards.

use std::path::PathBuf;

use {
    secrecy::ExposeSecret,
    telegpick_config::TelegramConfig,
    teloxide::{
        Bot,
        prelude::*,
        types::{ChatId, InputFile},
    },
    tracing::debug,
};

use crate::{Error, Result};

/// Delivers link codes and avatar pushes to a user's linked chat.
///
/// Each public method builds its own [`Bot`] and tears it down when the call
/// returns, so concurrent dispatches never share a connection.
pub struct Connector {
    token: secrecy::SecretString,
    pics_dir: PathBuf,
}

impl Connector {
    pub fn new(telegram: &TelegramConfig, pics_dir: PathBuf) -> Self {
        Self {
            token: telegram.bot_token.clone(),
            pics_dir,
        }
    }

    fn bot(&self) -> Bot {
        Bot::new(self.token.expose_secret())
    }

    /// Deliver a freshly generated link code to `chat_id`.
    pub async fn send_link_code(&self, chat_id: i64, code: &str) -> Result<()> {
        let bot = self.bot();
        bot.send_message(
            ChatId(chat_id),
            format!("Your telegpick link code: {code}"),
        )
        .await?;
        Ok(())
    }

    /// Replace the linked chat's photo with the stored pic `filename`.
    ///
    /// Mirrors the delete-then-upload sequence Telegram expects: the current
    /// photo is removed first, and a chat that has none is not an error.
    pub async fn set_avatar(&self, chat_id: i64, filename: &str) -> Result<()> {
        let path = self.pics_dir.join(filename);
        if !path.is_file() {
            return Err(Error::MissingPic { path });
        }

        let bot = self.bot();
        if let Err(error) = bot.delete_chat_photo(ChatId(chat_id)).await {
            debug!(chat_id, %error, "no existing chat photo to delete");
        }
        bot.set_chat_photo(ChatId(chat_id), InputFile::file(path))
            .await?;
        Ok(())
    }
}
