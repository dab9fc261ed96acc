//! # Marketing Strategy Helper
//!
//! A thin request/response wrapper around a Gemini-style `generateContent`
//! endpoint. The site's strategy widget posts a short business profile and
//! receives a plain-text plan back.
//!
//! The HTTP work goes through [`ApiClient`], so transient upstream failures
//! are retried before they surface as [`StrategyError::Upstream`].

use reqwest::{header::HeaderMap, header::HeaderValue, Method};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::retrieve::ky_http::ApiClient;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Upstream model returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Upstream model returned no text")]
    Empty,

    #[error("Upstream request failed: {0}")]
    Transport(String),
}

/// Business profile submitted by the strategy widget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRequest {
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResponse {
    pub strategy: String,
}

/// # Strategy Client
///
/// Holds the upstream API key and model name next to a retrying
/// [`ApiClient`] pointed at the model host.
pub struct StrategyClient {
    client: ApiClient,
    api_key: String,
    model: String,
}

impl StrategyClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: ApiClient::new(base_url, None)?,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Renders the profile into the instruction sent to the model.
    ///
    /// Fails when `industry` or `goals` is blank.
    pub fn build_prompt(request: &StrategyRequest) -> Result<String, StrategyError> {
        let industry = request.industry.trim();
        if industry.is_empty() {
            return Err(StrategyError::MissingField("industry"));
        }
        let goals = request.goals.trim();
        if goals.is_empty() {
            return Err(StrategyError::MissingField("goals"));
        }

        let mut prompt = String::from(
            "You are a senior digital marketing strategist. Write a concise, \
             actionable marketing strategy with a short summary, three to five \
             prioritized channels with tactics, and the KPIs to track.\n\n",
        );
        if let Some(name) = request.business_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(&format!("Business: {}\n", name));
        }
        prompt.push_str(&format!("Industry: {}\n", industry));
        prompt.push_str(&format!("Goals: {}\n", goals));
        if let Some(budget) = request.budget.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(&format!("Monthly budget: {}\n", budget));
        }
        if let Some(audience) = request.audience.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(&format!("Target audience: {}\n", audience));
        }
        Ok(prompt)
    }

    /// Asks the model for a strategy and returns its text.
    pub async fn generate(&self, request: &StrategyRequest) -> Result<String, StrategyError> {
        // 1. Validate and render the prompt before touching the network
        let prompt = Self::build_prompt(request)?;

        // 2. Build the generateContent call
        let action = format!("{}:generateContent", self.model);
        let url = self
            .client
            .endpoint(&["v1beta", "models", &action])
            .map_err(|e| StrategyError::Transport(format!("{:#}", e)))?;
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| StrategyError::Transport("API key is not a valid header value".into()))?;
        headers.insert("x-goog-api-key", key);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });

        // 3. Execute and classify the outcome
        debug!(model = %self.model, "Requesting marketing strategy");
        let response = self
            .client
            .request_url::<Value, Value>(Method::POST, url, Some(headers), Some(body))
            .await
            .map_err(|e| StrategyError::Transport(format!("{:#}", e)))?;

        if !response.success {
            warn!(status = response.status, "Strategy model call failed");
            return Err(StrategyError::Upstream {
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            });
        }

        response
            .data
            .as_ref()
            .and_then(candidate_text)
            .ok_or(StrategyError::Empty)
    }
}

/// Concatenates the text parts of the first candidate.
fn candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> StrategyRequest {
        StrategyRequest {
            business_name: Some("Northwind".into()),
            industry: "Retail".into(),
            goals: "More online orders".into(),
            budget: Some("  ".into()),
            audience: None,
        }
    }

    #[test]
    fn prompt_lists_only_provided_fields() {
        let prompt = StrategyClient::build_prompt(&request()).unwrap();
        assert!(prompt.contains("Business: Northwind\n"));
        assert!(prompt.contains("Industry: Retail\n"));
        assert!(prompt.contains("Goals: More online orders\n"));
        assert!(!prompt.contains("budget"));
        assert!(!prompt.contains("audience"));
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut r = request();
        r.industry = " ".into();
        assert!(matches!(
            StrategyClient::build_prompt(&r),
            Err(StrategyError::MissingField("industry"))
        ));
        let mut r = request();
        r.goals.clear();
        assert!(matches!(
            StrategyClient::build_prompt(&r),
            Err(StrategyError::MissingField("goals"))
        ));
    }

    #[test]
    fn request_accepts_camel_case_json() {
        let r: StrategyRequest = serde_json::from_value(json!({
            "businessName": "Lumen", "industry": "Dental", "goals": "Bookings"
        }))
        .unwrap();
        assert_eq!(r.business_name.as_deref(), Some("Lumen"));
        assert!(r.audience.is_none());
    }

    #[test]
    fn candidate_text_joins_parts() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Plan: " }, { "text": "SEO first." }] } }]
        });
        assert_eq!(candidate_text(&payload).as_deref(), Some("Plan: SEO first."));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }
}
