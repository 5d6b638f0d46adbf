//! Delivery capability — the abstract ability to notify one subscriber
//! about one episode release, independent of the concrete channel.
//!
//! The dispatcher only sees the [`Deliver`] trait; [`TelegramNotifier`] is
//! the production implementation over the Telegram Bot API.

use chrono::Utc;

use herald_common::types::{DispatchOutcome, EpisodePayload};

/// Delivery-side failures. A transport error means no structured status was
/// obtained at all — the dispatcher leaves the record untouched so it is
/// reconsidered on the next pass.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// One delivery attempt to one subscriber.
#[allow(async_fn_in_trait)]
pub trait Deliver {
    async fn attempt(
        &self,
        subscriber_id: i64,
        payload: &EpisodePayload,
    ) -> Result<DispatchOutcome, DeliveryError>;
}

/// Telegram Bot API delivery channel.
pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String) -> Self {
        Self::with_base_url(bot_token, "https://api.telegram.org".to_string())
    }

    /// Point the notifier at a non-default API host (used by tests).
    pub fn with_base_url(bot_token: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            bot_token,
        }
    }

    /// Render the HTML message body for an episode release.
    fn render_message(payload: &EpisodePayload) -> String {
        format!(
            "<b>{}</b>\nSeason {}, episode {} — \u{201c}{}\u{201d} is out.\n{}",
            escape_html(&payload.show_title),
            payload.season_number,
            payload.episode_number,
            escape_html(&payload.episode_title),
            payload.url,
        )
    }
}

impl Deliver for TelegramNotifier {
    async fn attempt(
        &self,
        subscriber_id: i64,
        payload: &EpisodePayload,
    ) -> Result<DispatchOutcome, DeliveryError> {
        let endpoint = format!("{}/bot{}/sendMessage", self.base_url, self.bot_token);
        let body = serde_json::json!({
            "chat_id": subscriber_id,
            "text": Self::render_message(payload),
            "parse_mode": "HTML",
        });

        let response = self.http.post(&endpoint).json(&body).send().await?;
        let outcome = DispatchOutcome {
            status_code: response.status().as_u16(),
            attempted_at: Utc::now(),
        };

        tracing::debug!(
            subscriber_id,
            status = outcome.status_code,
            "Delivery attempt finished"
        );
        Ok(outcome)
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
