use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Sending the notification failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Best-effort notification sink. A failed or unconfigured notifier never
/// fails the request that triggered it; the outcome is logged instead.
pub struct Notifier {
    telegram: Option<TelegramNotifier>,
}

impl Notifier {
    #[must_use]
    pub fn new(telegram: Option<TelegramNotifier>) -> Self {
        Self { telegram }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self { telegram: None }
    }

    pub async fn notify(&self, text: &str) {
        let Some(telegram) = &self.telegram else {
            debug!("Notifier not configured, dropping notification");
            return;
        };

        if let Err(err) = telegram.send(text).await {
            warn!(error = %err, "Failed to deliver notification");
        }
    }
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    #[must_use]
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        self.client
            .post(url)
            .form(&[("chat_id", self.chat_id.as_str()), ("text", text)])
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
