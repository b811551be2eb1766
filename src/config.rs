use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::domain::ticket::TicketDefaults;
use crate::domain::verdict::{DetectionMode, IssueType, Priority};
use crate::error::{AppError, AppResult};

pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub slack: SlackSettings,
    pub jira: JiraSettings,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    pub monitored_channels: Vec<String>,
    pub notification_channel: String,
}

impl SlackSettings {
    pub fn is_monitored(&self, channel_name: &str) -> bool {
        self.monitored_channels
            .iter()
            .any(|name| name.trim().trim_start_matches('#') == channel_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraSettings {
    pub url: String,
    pub project_key: String,
    #[serde(default = "default_issue_type")]
    pub default_issue_type: IssueType,
    #[serde(default = "default_priority")]
    pub default_priority: Priority,
    /// Status a freshly created issue is moved to, if any.
    #[serde(default)]
    pub initial_status: Option<String>,
}

impl JiraSettings {
    pub fn ticket_defaults(&self) -> TicketDefaults {
        TicketDefaults {
            issue_type: self.default_issue_type,
            priority: self.default_priority,
        }
    }

    pub fn desired_status(&self) -> Option<&str> {
        self.initial_status
            .as_deref()
            .map(str::trim)
            .filter(|status| !status.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiSettings {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub detection_mode: DetectionMode,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            detection_mode: DetectionMode::default(),
            confidence_threshold: default_threshold(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_issue_type() -> IssueType {
    IssueType::Task
}

fn default_priority() -> Priority {
    Priority::Medium
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            AppError::Configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> AppResult<Self> {
        let config: AppConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if self.slack.monitored_channels.is_empty() {
            return Err(AppError::Configuration(
                "slack.monitored_channels must list at least one channel".to_string(),
            ));
        }
        if self.slack.notification_channel.trim().is_empty() {
            return Err(AppError::Configuration(
                "slack.notification_channel must not be empty".to_string(),
            ));
        }
        if self.jira.url.trim().is_empty() {
            return Err(AppError::Configuration(
                "jira.url must not be empty".to_string(),
            ));
        }
        if self.jira.project_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "jira.project_key must not be empty".to_string(),
            ));
        }
        let threshold = self.ai.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::Configuration(format!(
                "ai.confidence_threshold must be between 0 and 1, got {threshold}"
            )));
        }
        Ok(())
    }
}

pub const SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const SLACK_SIGNING_SECRET: &str = "SLACK_SIGNING_SECRET";
pub const SLACK_APP_TOKEN: &str = "SLACK_APP_TOKEN";
pub const JIRA_EMAIL: &str = "JIRA_EMAIL";
pub const JIRA_API_TOKEN: &str = "JIRA_API_TOKEN";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// Credentials for the three remote services, read from the environment.
pub struct Secrets {
    pub slack_bot_token: SecretString,
    pub slack_signing_secret: SecretString,
    pub slack_app_token: SecretString,
    pub jira_email: String,
    pub jira_api_token: SecretString,
    pub anthropic_api_key: SecretString,
}

impl Secrets {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Every missing variable is reported, not just the first.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let slack_bot_token = read(SLACK_BOT_TOKEN);
        let slack_signing_secret = read(SLACK_SIGNING_SECRET);
        let slack_app_token = read(SLACK_APP_TOKEN);
        let jira_email = read(JIRA_EMAIL);
        let jira_api_token = read(JIRA_API_TOKEN);
        let anthropic_api_key = read(ANTHROPIC_API_KEY);

        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            slack_bot_token: SecretString::from(slack_bot_token),
            slack_signing_secret: SecretString::from(slack_signing_secret),
            slack_app_token: SecretString::from(slack_app_token),
            jira_email,
            jira_api_token: SecretString::from(jira_api_token),
            anthropic_api_key: SecretString::from(anthropic_api_key),
        })
    }
}
