//! Report generation over an OpenAI-compatible chat completions API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::InsightConfig;
use crate::telemetry::TelemetryRow;

use super::summary::WindowSummary;

/// Error type for insight report generation.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("insight generation is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("model returned an empty report")]
    EmptyResponse,
}

/// Input for one report: the product, its window, and its aggregates.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub site: String,
    pub asin: String,
    pub range_days: u32,
    pub summary: WindowSummary,
    pub rows: Vec<TelemetryRow>,
}

/// Turns a telemetry window into a prose report.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn generate(&self, context: &ReportContext) -> Result<String, InsightError>;
}

/// Calls a chat completions endpoint with the window serialized into the
/// prompt.
pub struct HttpReportGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpReportGenerator {
    pub fn new(config: &InsightConfig) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InsightError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

const SYSTEM_PROMPT: &str = "You are an e-commerce analyst. Given daily telemetry \
for one product (price, buybox price, rank, rating, seller count), write a concise \
report: notable price moves, rank trajectory, rating changes, and anything a seller \
should act on. Plain prose, no markdown tables.";

fn build_prompt(context: &ReportContext) -> String {
    let mut prompt = format!(
        "Product {} on site {}, last {} days ({} data points, {} to {}).\n\n",
        context.asin,
        context.site,
        context.range_days,
        context.summary.days,
        context.summary.from,
        context.summary.to,
    );
    prompt.push_str(&format!(
        "Price: min {:.2} max {:.2} avg {:.2}. Buybox: min {:.2} max {:.2} avg {:.2}.\n",
        context.summary.price_min,
        context.summary.price_max,
        context.summary.price_avg,
        context.summary.buybox_min,
        context.summary.buybox_max,
        context.summary.buybox_avg,
    ));
    if let (Some(best), Some(worst)) = (context.summary.rank_best, context.summary.rank_worst) {
        prompt.push_str(&format!("Rank: best {best}, worst {worst}.\n"));
    }

    prompt.push_str("\nDaily data (date, buybox, price, rank, rating, sellers):\n");
    for row in &context.rows {
        prompt.push_str(&format!(
            "{} {:.2} {:.2} {} {} {}\n",
            row.date,
            row.buybox_price,
            row.price,
            row.rank.map_or_else(|| "-".to_string(), |v| v.to_string()),
            row.rating.map_or_else(|| "-".to_string(), |v| format!("{v:.1}")),
            row.seller_count
                .map_or_else(|| "-".to_string(), |v| v.to_string()),
        ));
    }
    prompt
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ReportGenerator for HttpReportGenerator {
    async fn generate(&self, context: &ReportContext) -> Result<String, InsightError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(context),
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| InsightError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::Api { status, message });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| InsightError::Json(e.to_string()))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(InsightError::EmptyResponse);
        }
        Ok(text)
    }
}
