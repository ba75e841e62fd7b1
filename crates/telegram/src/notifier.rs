use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::debug;

use common::{Error, Heartbeat, Notifier, PairTrendState, Result, Signal};

use crate::format;

/// Delivers scanner output to one Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }

    async fn send(&self, text: String) -> Result<()> {
        self.bot
            .send_message(self.chat_id, text)
            .await
            .map_err(|e| Error::Notify(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_signal(&self, signal: &Signal) -> Result<()> {
        debug!(symbol = %signal.symbol, "Sending signal alert");
        self.send(format::signal_alert(signal)).await
    }

    async fn notify_daily_summary(&self, states: &[PairTrendState]) -> Result<()> {
        self.send(format::daily_summary(states)).await
    }

    async fn notify_heartbeat(&self, heartbeat: &Heartbeat) -> Result<()> {
        self.send(format::heartbeat(heartbeat)).await
    }
}
