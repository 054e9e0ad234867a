use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WhatsAppConfig;
use crate::util::format_phone_number;

/// One normalized inbound chat message, built per webhook call.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub from_number: String,
    pub text: String,
    pub media_url: Option<String>,
    pub received_at: DateTime<Utc>,
}

/// Outbound messaging capability. Implemented by [`WhatsAppClient`] in
/// production and by a recording double in tests.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send(&self, to: &str, text: &str) -> Result<()>;
}

// ── Inbound payload parsing (WhatsApp Cloud API webhook shape) ──────────────

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    #[serde(default)]
    value: ChangeValue,
}

#[derive(Debug, Deserialize, Default)]
struct ChangeValue {
    #[serde(default)]
    messages: Vec<WebhookMessage>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    from: String,
    #[serde(default)]
    text: Option<TextBody>,
    #[serde(default)]
    image: Option<MediaBody>,
}

#[derive(Debug, Deserialize)]
struct TextBody {
    body: String,
}

#[derive(Debug, Deserialize)]
struct MediaBody {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

/// Extract the first chat message from a webhook payload.
///
/// Returns `Ok(None)` for payloads that carry no user message (delivery and
/// read-status callbacks arrive on the same endpoint). The sender number is
/// normalized to the local "08..." form.
pub fn parse_webhook_payload(payload: &serde_json::Value) -> Result<Option<InboundMessage>> {
    let payload: WebhookPayload =
        serde_json::from_value(payload.clone()).context("Malformed webhook payload")?;

    let message = payload
        .entry
        .into_iter()
        .flat_map(|e| e.changes)
        .flat_map(|c| c.value.messages)
        .next();

    let Some(message) = message else {
        return Ok(None);
    };

    let media_url = message.image.as_ref().and_then(|m| m.link.clone());
    let text = match (&message.text, &message.image) {
        (Some(text), _) => text.body.clone(),
        (None, Some(image)) => match &image.caption {
            Some(caption) => caption.clone(),
            None => return Ok(None),
        },
        (None, None) => return Ok(None),
    };

    Ok(Some(InboundMessage {
        from_number: format_phone_number(&message.from),
        text,
        media_url,
        received_at: Utc::now(),
    }))
}

// ── Outbound client ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    message_type: &'static str,
    text: SendText<'a>,
}

#[derive(Debug, Serialize)]
struct SendText<'a> {
    body: &'a str,
}

pub struct WhatsAppClient {
    client: reqwest::Client,
    config: WhatsAppConfig,
}

impl WhatsAppClient {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Gateway for WhatsAppClient {
    async fn send(&self, to: &str, text: &str) -> Result<()> {
        let request = SendRequest {
            messaging_product: "whatsapp",
            to,
            message_type: "text",
            text: SendText { body: text },
        };

        let url = format!("{}/messages", self.config.api_url);
        debug!("Sending WhatsApp message to {}", to);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.api_token),
            )
            .json(&request)
            .send()
            .await
            .context("Failed to send request to WhatsApp API")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("WhatsApp API error ({}): {}", status, error_body);
        }

        Ok(())
    }
}
