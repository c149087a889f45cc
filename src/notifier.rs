use anyhow::{anyhow, Context, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::types::{ChatPayload, MattermostSettings};

/// How the payload body is produced. Tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryEncoding {
    /// Body serialised by serde_json.
    Json,
    /// Hand-built body with every control and non-ASCII character `\u`-escaped.
    EscapedText,
}

const DELIVERY_ORDER: [DeliveryEncoding; 2] = [DeliveryEncoding::Json, DeliveryEncoding::EscapedText];

pub struct MattermostNotifier {
    client: reqwest::Client,
    settings: MattermostSettings,
}

impl MattermostNotifier {
    pub fn new(settings: &MattermostSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            settings: settings.clone(),
        })
    }

    pub fn build_payload(&self, text: &str) -> ChatPayload {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        ChatPayload {
            text: text.to_string(),
            username: non_empty(&self.settings.username),
            icon_emoji: non_empty(&self.settings.icon_emoji),
            channel: self.settings.channel.as_deref().and_then(non_empty),
        }
    }

    /// Best-effort delivery. Returns whether any encoding got a 200 back.
    pub async fn send(&self, text: &str) -> bool {
        if !self.settings.enabled {
            info!("Mattermost notifications are disabled in configuration");
            return false;
        }
        let Some(url) = self.settings.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            error!("Mattermost webhook URL is not configured");
            return false;
        };

        let payload = self.build_payload(text);
        info!(
            "Sending notification to Mattermost channel: {}",
            payload.channel.as_deref().unwrap_or("(webhook default)")
        );
        for encoding in DELIVERY_ORDER {
            match self.deliver(url, &payload, encoding).await {
                Ok(()) => {
                    info!("Successfully sent notification to Mattermost ({:?})", encoding);
                    return true;
                }
                Err(e) => warn!("Mattermost delivery with {:?} encoding failed: {:#}", encoding, e),
            }
        }
        error!("Failed to send notification to Mattermost");
        false
    }

    async fn deliver(&self, url: &str, payload: &ChatPayload, encoding: DeliveryEncoding) -> Result<()> {
        let req = self.client.post(url);
        let req = match encoding {
            DeliveryEncoding::Json => req.json(payload),
            DeliveryEncoding::EscapedText => req
                .header(CONTENT_TYPE, "application/json")
                .body(encode_escaped_payload(payload)),
        };
        let res = req.send().await.context("Failed to send Mattermost request")?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("Mattermost webhook returned {} - {}", status, body));
        }
        Ok(())
    }
}

/// JSON string escaping that emits pure ASCII.
pub fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out
}

pub fn encode_escaped_payload(payload: &ChatPayload) -> String {
    let mut fields = vec![format!("\"text\":\"{}\"", escape_json_string(&payload.text))];
    let optional = [
        ("username", &payload.username),
        ("icon_emoji", &payload.icon_emoji),
        ("channel", &payload.channel),
    ];
    for (key, value) in optional {
        if let Some(v) = value {
            fields.push(format!("\"{}\":\"{}\"", key, escape_json_string(v)));
        }
    }
    format!("{{{}}}", fields.join(","))
}
