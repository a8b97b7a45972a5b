//! Slack Events API envelope, as delivered to the webhook endpoint.
//!
//! See <https://api.slack.com/events-api> and <https://api.slack.com/events/reaction_added>.

use serde::{Deserialize, Deserializer};

/// The one nested event type the relay acts on.
pub const REACTION_ADDED: &str = "reaction_added";

/// Top-level webhook payload (`event_callback`, `url_verification`, ...).
/// Every field defaults to empty when missing or `null`, so partial payloads still parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEnvelope {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub typ: String,
    /// Present only during the URL verification handshake.
    #[serde(default, deserialize_with = "null_as_default")]
    pub challenge: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: SlackEvent,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackEvent {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub typ: String,
    /// User who added the reaction.
    #[serde(default, deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub item: EventItem,
    /// Emoji name, without colons.
    #[serde(default, deserialize_with = "null_as_default")]
    pub reaction: String,
}

/// The message a reaction was added to. `ts` is unique within `channel`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventItem {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub typ: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ts: String,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl SlackEnvelope {
    pub fn is_reaction_added(&self) -> bool {
        self.event.typ == REACTION_ADDED
    }
}
