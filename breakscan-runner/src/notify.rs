//! Webhook notifications for scan alerts.
//!
//! Payloads use the embed format accepted by chat webhooks: a list of
//! embeds, each with a title, colour, timestamp, inline fields and footer.
//! Delivery is best effort. Failures are logged and reported to the
//! caller, but never abort a scan.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use breakscan_core::CompositeResult;

use crate::scanner::ScanReport;

/// Most tickers listed in one alert message.
pub const MAX_ALERT_FIELDS: usize = 10;
pub const ALERT_COLOR: u32 = 5_814_783;
pub const SUMMARY_COLOR: u32 = 3_447_003;
const FOOTER_PREFIX: &str = "Early Breakout Scanner";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub timestamp: String,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
}

fn footer(now: DateTime<Utc>) -> EmbedFooter {
    EmbedFooter {
        text: format!("{FOOTER_PREFIX} • {}", now.format("%Y-%m-%d %H:%M:%S")),
    }
}

/// Alert message listing the top alerted tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub embeds: Vec<Embed>,
}

impl AlertPayload {
    pub fn new(alerts: &[&CompositeResult], now: DateTime<Utc>) -> Self {
        let fields = alerts.iter().take(MAX_ALERT_FIELDS).map(|r| alert_field(r)).collect();
        let embed = Embed {
            title: "🚨 Early Breakout Scanner Alert".into(),
            description: Some(format!("Found **{}** stocks meeting criteria", alerts.len())),
            color: ALERT_COLOR,
            timestamp: now.to_rfc3339(),
            fields,
            footer: footer(now),
        };
        Self { embeds: vec![embed] }
    }
}

fn alert_field(r: &CompositeResult) -> EmbedField {
    let card = &r.score;
    let mut lines = Vec::with_capacity(5);
    if card.volume.signal {
        lines.push("✅ Volume Dry-Up".to_string());
    }
    if card.momentum.signal {
        lines.push("✅ Divergences".to_string());
    }
    if card.relative_strength.signal {
        lines.push("✅ Rel. Strength".to_string());
    }
    lines.push(format!("**Total Score:** {}/{}", card.total, card.max_total));
    lines.push(format!("**Price:** ${:.2}", r.current_price));

    EmbedField {
        name: format!("📈 {}", r.ticker),
        value: lines.join("\n"),
        inline: true,
    }
}

/// End-of-scan summary message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub embeds: Vec<Embed>,
}

impl SummaryPayload {
    pub fn new(scanned: usize, alerts: usize, duration_ms: u64, now: DateTime<Utc>) -> Self {
        let field = |name: &str, value: String| EmbedField {
            name: name.into(),
            value,
            inline: true,
        };
        let embed = Embed {
            title: "📊 Scan Complete".into(),
            description: None,
            color: SUMMARY_COLOR,
            timestamp: now.to_rfc3339(),
            fields: vec![
                field("Stocks Scanned", scanned.to_string()),
                field("Alerts Generated", alerts.to_string()),
                field("Scan Duration", format!("{:.1}s", duration_ms as f64 / 1000.0)),
            ],
            footer: footer(now),
        };
        Self { embeds: vec![embed] }
    }
}

/// What [`WebhookNotifier::notify_scan`] managed to deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub alert_sent: bool,
    pub summary_sent: bool,
}

/// Posts payloads to a webhook URL. Without a URL every send is a no-op.
pub struct WebhookNotifier {
    url: Option<String>,
    client: reqwest::blocking::Client,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            url: url.filter(|u| !u.trim().is_empty()),
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Post one payload. `Ok(false)` when no URL is configured.
    pub fn send<T: Serialize>(&self, payload: &T) -> Result<bool, NotifyError> {
        let Some(url) = &self.url else {
            debug!("webhook not configured; skipping");
            return Ok(false);
        };

        let response = self.client.post(url).json(payload).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            let body = response.text().unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Send the alert list (when anything alerted) and the summary.
    pub fn notify_scan(&self, report: &ScanReport) -> Delivery {
        if !self.is_configured() {
            return Delivery::default();
        }
        let now = Utc::now();
        let alerts = report.alerts();
        let mut delivery = Delivery::default();

        if !alerts.is_empty() {
            match self.send(&AlertPayload::new(&alerts, now)) {
                Ok(sent) => {
                    delivery.alert_sent = sent;
                    info!(alerts = alerts.len(), "alert notification sent");
                }
                Err(e) => warn!(error = %e, "alert notification failed"),
            }
        }

        match self.send(&SummaryPayload::new(report.scanned, alerts.len(), report.duration_ms, now)) {
            Ok(sent) => delivery.summary_sent = sent,
            Err(e) => warn!(error = %e, "summary notification failed"),
        }
        delivery
    }
}
