use std::future::Future;
use std::io;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AppConfig, Secrets};
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::anthropic::AnthropicClient;
use crate::infra::jira::JiraClient;
use crate::infra::slack::SlackClient;
use crate::infra::socket_mode::SocketModeListener;

/// Connects to Slack and processes messages until Ctrl-C.
pub async fn run(config: AppConfig) -> AppResult<()> {
    let secrets = Secrets::from_env()?;
    until_interrupted(serve(config, secrets), tokio::signal::ctrl_c()).await
}

/// Runs `work` to completion unless `interrupt` resolves first, in which case
/// the shutdown is reported and treated as success.
async fn until_interrupted<W, I>(work: W, interrupt: I) -> AppResult<()>
where
    W: Future<Output = AppResult<()>>,
    I: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = work => result,
        _ = interrupt => {
            info!("received interrupt");
            println!("Shutting down gracefully...");
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, secrets: Secrets) -> AppResult<()> {
    let Secrets {
        slack_bot_token,
        slack_signing_secret: _signing_secret,
        slack_app_token,
        jira_email,
        jira_api_token,
        anthropic_api_key,
    } = secrets;

    let slack = Arc::new(SlackClient::new(slack_bot_token, slack_app_token));
    let identity = slack.auth_test().await?;
    if identity.user_id.is_none() {
        warn!("auth.test returned no user id; the agent cannot recognise its own messages");
    }
    info!(
        team = identity.team.as_deref().unwrap_or("unknown"),
        bot_id = identity.bot_id.as_deref().unwrap_or("unknown"),
        "authenticated with Slack"
    );

    let issue_tracker = Arc::new(JiraClient::new(
        &config.jira.url,
        jira_email,
        jira_api_token,
    ));
    let language_model = Arc::new(AnthropicClient::new(
        anthropic_api_key,
        config.ai.model.clone(),
        config.ai.max_tokens,
    ));

    info!(
        channels = %config.slack.monitored_channels.join(", "),
        project = %config.jira.project_key,
        mode = config.ai.detection_mode.as_str(),
        threshold = config.ai.confidence_threshold,
        "starting hark"
    );

    let ctx = AppContext::new(
        config,
        identity.user_id,
        slack.clone(),
        issue_tracker,
        language_model,
    );
    SocketModeListener::new(slack, ctx).run().await
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn interrupt_during_startup_exits_cleanly() {
        let stuck_startup = future::pending::<AppResult<()>>();

        let result = until_interrupted(stuck_startup, future::ready(Ok(()))).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn startup_error_is_returned_without_interrupt() {
        let failing = async { Err(AppError::Chat("auth.test failed: invalid_auth".to_string())) };

        let result = until_interrupted(failing, future::pending::<io::Result<()>>()).await;

        assert!(matches!(result, Err(AppError::Chat(reason)) if reason.contains("invalid_auth")));
    }
}
