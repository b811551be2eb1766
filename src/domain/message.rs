use serde::Deserialize;

/// A `message` event as delivered by the chat platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    pub channel: String,
    pub ts: String,
    /// Set when the message is a reply; the parent's `ts`.
    #[serde(default)]
    pub thread_ts: Option<String>,
    /// Edits, deletions, joins and bot posts all carry a subtype.
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

/// A message admitted for classification.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel_id: String,
    pub channel_name: String,
    pub author_id: String,
    pub text: String,
    pub timestamp: String,
}

impl InboundMessage {
    pub fn from_event(event: &MessageEvent, author_id: &str, channel_name: &str) -> Self {
        Self {
            channel_id: event.channel.clone(),
            channel_name: channel_name.to_string(),
            author_id: author_id.to_string(),
            text: event.text.clone(),
            timestamp: event.ts.clone(),
        }
    }
}
