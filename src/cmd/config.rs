use std::path::Path;

use clap::{Args, Subcommand};

use crate::config::{
    ANTHROPIC_API_KEY, AppConfig, JIRA_API_TOKEN, JIRA_EMAIL, SLACK_APP_TOKEN, SLACK_BOT_TOKEN,
    SLACK_SIGNING_SECRET, Secrets,
};
use crate::error::AppResult;

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked).
    Show,
    /// Validate the configuration file and required secrets without connecting.
    Check,
}

pub fn run(command: ConfigCommand, path: &Path) -> AppResult<()> {
    match command {
        ConfigCommand::Show => run_show(path),
        ConfigCommand::Check => run_check(path),
    }
}

fn run_show(path: &Path) -> AppResult<()> {
    let config = AppConfig::load(path)?;

    println!("Configuration file: {}", path.display());
    println!(
        "Monitored channels: {}",
        config.slack.monitored_channels.join(", ")
    );
    println!("Notification channel: {}", config.slack.notification_channel);
    println!("Jira URL: {}", config.jira.url);
    println!("Jira project: {}", config.jira.project_key);
    println!("Default issue type: {}", config.jira.default_issue_type);
    println!("Default priority: {}", config.jira.default_priority);
    println!(
        "Initial status: {}",
        display_value(config.jira.desired_status())
    );
    println!("Model: {}", config.ai.model);
    println!("Detection mode: {}", config.ai.detection_mode.as_str());
    println!("Confidence threshold: {}", config.ai.confidence_threshold);
    println!("Log level: {}", config.logging.level);
    println!(
        "Log file: {}",
        display_value(
            config
                .logging
                .file
                .as_deref()
                .and_then(|file| file.to_str())
        )
    );

    println!();
    for name in [
        SLACK_BOT_TOKEN,
        SLACK_SIGNING_SECRET,
        SLACK_APP_TOKEN,
        JIRA_API_TOKEN,
        ANTHROPIC_API_KEY,
    ] {
        println!("{name}: {}", mask_secret(std::env::var(name).ok().as_deref()));
    }
    println!(
        "{JIRA_EMAIL}: {}",
        display_value(std::env::var(JIRA_EMAIL).ok().as_deref())
    );

    Ok(())
}

fn run_check(path: &Path) -> AppResult<()> {
    let config = AppConfig::load(path)?;
    Secrets::from_env()?;

    println!(
        "Configuration OK: {} monitored channel(s), filing into {}.",
        config.slack.monitored_channels.len(),
        config.jira.project_key
    );
    Ok(())
}

fn display_value(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(token) if token.chars().count() > 6 => {
            let prefix: String = token.chars().take(3).collect();
            let suffix: String = token.chars().skip(token.chars().count() - 3).collect();
            format!("{prefix}***{suffix}")
        }
        Some(token) if !token.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_the_ends() {
        assert_eq!(mask_secret(Some("xoxb-1234-abcd")), "xox***bcd");
        assert_eq!(mask_secret(Some("short")), "***");
        assert_eq!(mask_secret(Some("")), "<not set>");
        assert_eq!(mask_secret(None), "<not set>");
    }

    #[test]
    fn blank_values_show_as_unset() {
        assert_eq!(display_value(Some("To Do")), "To Do");
        assert_eq!(display_value(Some("")), "<not set>");
        assert_eq!(display_value(None), "<not set>");
    }
}
