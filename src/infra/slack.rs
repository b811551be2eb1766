use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER},
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::services::{ChatService, OutgoingMessage, UserProfile};

pub const DEFAULT_API_URL: &str = "https://slack.com/api";

pub struct SlackClient {
    http: Client,
    api_url: String,
    bot_token: SecretString,
    app_token: SecretString,
}

/// Who the bot is, according to `auth.test`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub user_id: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
}

impl SlackClient {
    pub fn new(bot_token: SecretString, app_token: SecretString) -> Self {
        Self::with_api_url(DEFAULT_API_URL, bot_token, app_token)
    }

    pub fn with_api_url(api_url: &str, bot_token: SecretString, app_token: SecretString) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            app_token,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{method}", self.api_url)
    }

    fn bearer(token: &SecretString) -> String {
        format!("Bearer {}", token.expose_secret())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
    ) -> AppResult<T> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::Chat(format!("failed to call {method}: {err}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("?")
                .to_string();
            return Err(AppError::Chat(format!(
                "{method} was rate limited; retry after {retry_after}s"
            )));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::Chat(format!(
                "Slack responded with {status} to {method}: {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|err| AppError::Chat(format!("failed to parse {method} response: {err}")))?;

        if payload.get("ok").and_then(|ok| ok.as_bool()) != Some(true) {
            let error = payload
                .get("error")
                .and_then(|error| error.as_str())
                .unwrap_or("unknown_error");
            return Err(AppError::Chat(format!("{method} failed: {error}")));
        }

        serde_json::from_value(payload)
            .map_err(|err| AppError::Chat(format!("unexpected {method} response: {err}")))
    }

    pub async fn auth_test(&self) -> AppResult<BotIdentity> {
        let request = self
            .http
            .post(self.endpoint("auth.test"))
            .header(AUTHORIZATION, Self::bearer(&self.bot_token));
        let identity: BotIdentity = self.call(request, "auth.test").await?;
        debug!(user_id = ?identity.user_id, team = ?identity.team, "authenticated with Slack");
        Ok(identity)
    }

    /// Asks for a fresh Socket Mode WebSocket URL using the app-level token.
    pub async fn open_socket_url(&self) -> AppResult<String> {
        let request = self
            .http
            .post(self.endpoint("apps.connections.open"))
            .header(AUTHORIZATION, Self::bearer(&self.app_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        let response: ConnectionsOpenResponse = self.call(request, "apps.connections.open").await?;
        Ok(response.url)
    }
}

#[async_trait]
impl ChatService for SlackClient {
    async fn channel_name(&self, channel_id: &str) -> AppResult<String> {
        let request = self
            .http
            .get(self.endpoint("conversations.info"))
            .header(AUTHORIZATION, Self::bearer(&self.bot_token))
            .query(&[("channel", channel_id)]);
        let response: ConversationsInfoResponse = self.call(request, "conversations.info").await?;
        Ok(response.channel.name)
    }

    async fn user_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let request = self
            .http
            .get(self.endpoint("users.info"))
            .header(AUTHORIZATION, Self::bearer(&self.bot_token))
            .query(&[("user", user_id)]);
        let response: UsersInfoResponse = self.call(request, "users.info").await?;
        let user = response.user;

        let real_name = user
            .real_name
            .filter(|name| !name.is_empty())
            .or(user.profile.real_name.filter(|name| !name.is_empty()))
            .or(user.name)
            .unwrap_or_else(|| user_id.to_string());

        Ok(UserProfile {
            real_name,
            email: user.profile.email.filter(|email| !email.is_empty()),
        })
    }

    async fn post_message(&self, message: &OutgoingMessage) -> AppResult<()> {
        let body = PostMessageRequest {
            channel: &message.channel,
            text: &message.text,
            thread_ts: message.thread_ts.as_deref(),
            unfurl_links: message.unfurl_links,
        };
        let request = self
            .http
            .post(self.endpoint("chat.postMessage"))
            .header(AUTHORIZATION, Self::bearer(&self.bot_token))
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .json(&body);
        let _: serde_json::Value = self.call(request, "chat.postMessage").await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread_ts: Option<&'a str>,
    unfurl_links: bool,
}

#[derive(Deserialize)]
struct ConnectionsOpenResponse {
    url: String,
}

#[derive(Deserialize)]
struct ConversationsInfoResponse {
    channel: SlackChannel,
}

#[derive(Deserialize)]
struct SlackChannel {
    name: String,
}

#[derive(Deserialize)]
struct UsersInfoResponse {
    user: SlackUser,
}

#[derive(Deserialize)]
struct SlackUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    profile: SlackProfile,
}

#[derive(Deserialize, Default)]
struct SlackProfile {
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}
