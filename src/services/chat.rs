use async_trait::async_trait;

use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub real_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
    pub unfurl_links: bool,
}

impl OutgoingMessage {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            thread_ts: None,
            unfurl_links: true,
        }
    }

    pub fn in_thread(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn without_unfurl(mut self) -> Self {
        self.unfurl_links = false;
        self
    }
}

#[async_trait]
pub trait ChatService: Send + Sync {
    async fn channel_name(&self, channel_id: &str) -> AppResult<String>;

    async fn user_profile(&self, user_id: &str) -> AppResult<UserProfile>;

    async fn post_message(&self, message: &OutgoingMessage) -> AppResult<()>;
}
