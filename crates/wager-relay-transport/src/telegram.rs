//! Telegram connector.
//!
//! Each tenant token becomes a `teloxide::Bot` with its own long-polling
//! dispatcher. Text messages are parsed into commands and forwarded to the
//! controller; replies and notifications go back through the same bot.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use teloxide::{
    Bot,
    dispatching::{Dispatcher, UpdateFilterExt},
    prelude::Requester,
    types::{Message, Update},
};
use tokio::{sync::mpsc, task::AbortHandle};
use tokio_util::sync::CancellationToken;
use wager_relay_core::{
    ChatId, Command, IncomingCommand, TenantId,
    traits::{ConnectError, Connector, Messenger, NotifyError},
};

/// Telegram's limit on a single message.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// How long a dispatcher may take to stop before its task is aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Opens one polling bot per tenant.
#[derive(Debug, Default, Clone)]
pub struct TelegramConnector;

impl TelegramConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TelegramConnector {
    async fn connect(
        &self,
        tenant: &TenantId,
        commands: mpsc::Sender<IncomingCommand>,
    ) -> Result<Arc<dyn Messenger>, ConnectError> {
        let bot = Bot::new(tenant.as_str());
        let me = bot
            .get_me()
            .await
            .map_err(|e| ConnectError::InvalidToken(e.to_string()))?;
        tracing::info!(tenant = %tenant, bot_id = %me.user.id, "Telegram bot verified");

        let cancel = CancellationToken::new();
        let polling = tokio::spawn(poll(bot.clone(), commands, cancel.clone()));

        Ok(Arc::new(TelegramMessenger {
            bot,
            cancel,
            polling: polling.abort_handle(),
        }))
    }
}

async fn poll(bot: Bot, commands: mpsc::Sender<IncomingCommand>, cancel: CancellationToken) {
    let handler = Update::filter_message().endpoint(move |msg: Message| {
        let commands = commands.clone();
        async move {
            if let Some(command) = msg.text().and_then(Command::parse) {
                let incoming = IncomingCommand {
                    chat_id: ChatId(msg.chat.id.0),
                    command,
                };
                if commands.send(incoming).await.is_err() {
                    tracing::debug!("Command channel closed");
                }
            }
            Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, handler).build();
    let shutdown_token = dispatcher.shutdown_token();

    tokio::spawn(async move {
        cancel.cancelled().await;
        if let Ok(done) = shutdown_token.shutdown() {
            done.await;
        }
    });

    dispatcher.dispatch().await;
}

/// Sending half of a tenant's bot.
pub struct TelegramMessenger {
    bot: Bot,
    cancel: CancellationToken,
    polling: AbortHandle,
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), NotifyError> {
        for chunk in split_message(text, MAX_MESSAGE_LENGTH) {
            self.bot
                .send_message(teloxide::types::ChatId(chat_id.0), chunk)
                .await
                .map_err(|e| NotifyError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn shutdown(&self) {
        self.cancel.cancel();
        let polling = self.polling.clone();
        tokio::spawn(async move {
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            polling.abort();
        });
    }
}

/// Split long messages at line boundaries to respect platform limits.
///
/// `max_len` counts characters, so multi-byte text is never cut mid-codepoint.
#[must_use]
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.lines() {
        let line_len = line.chars().count();
        if current_len + line_len + 1 > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > max_len {
            let chars: Vec<char> = line.chars().collect();
            chunks.extend(chars.chunks(max_len).map(|c| c.iter().collect::<String>()));
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
