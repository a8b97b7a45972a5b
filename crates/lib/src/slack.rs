//! Slack Web API client: reads a single message via conversations.history.

use serde::Deserialize;

const SLACK_API_BASE: &str = "https://slack.com";

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("SLACK_BOT_TOKEN is not set")]
    MissingToken,
    #[error("slack request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("slack response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
}

impl SlackError {
    /// True when the call was not attempted because configuration is missing.
    pub fn is_config(&self) -> bool {
        matches!(self, SlackError::MissingToken)
    }
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    text: String,
}

/// Client for the Slack Web API, authenticated with a bot token.
#[derive(Clone)]
pub struct SlackClient {
    token: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(token: Option<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| SLACK_API_BASE.to_string());
        Self {
            token,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// GET /api/conversations.history: text of the newest message at or before `ts` in `channel`.
    ///
    /// Returns an empty string when Slack answers `ok: false` or has no message there.
    pub async fn fetch_message_text(&self, channel: &str, ts: &str) -> Result<String, SlackError> {
        let token = self.token.as_ref().ok_or(SlackError::MissingToken)?;
        let url = format!("{}/api/conversations.history", self.base_url);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("channel", channel),
                ("latest", ts),
                ("inclusive", "true"),
                ("limit", "1"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(SlackError::Request)?;
        let data: HistoryResponse = res.json().await.map_err(SlackError::Decode)?;
        if !data.ok {
            log::debug!(
                "conversations.history returned ok: false ({})",
                data.error.as_deref().unwrap_or("no error code")
            );
            return Ok(String::new());
        }
        match data.messages.into_iter().next() {
            Some(m) => Ok(m.text),
            None => {
                log::debug!("no message in {} at or before {}", channel, ts);
                Ok(String::new())
            }
        }
    }
}
