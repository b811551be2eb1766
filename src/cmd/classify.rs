use secrecy::SecretString;

use crate::config::{ANTHROPIC_API_KEY, AppConfig};
use crate::error::{AppError, AppResult};
use crate::infra::anthropic::AnthropicClient;
use crate::workflow::classifier::{self, Classification};

/// Classifies `text` with the configured model and prints the verdict.
/// Nothing is filed or posted.
pub async fn run(config: &AppConfig, text: &str) -> AppResult<()> {
    let api_key = std::env::var(ANTHROPIC_API_KEY)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            AppError::Configuration(format!(
                "missing required environment variables: {ANTHROPIC_API_KEY}"
            ))
        })?;
    let model = AnthropicClient::new(
        SecretString::from(api_key),
        config.ai.model.clone(),
        config.ai.max_tokens,
    );

    let classification = classifier::classify(
        &model,
        text,
        config.ai.detection_mode,
        config.ai.confidence_threshold,
    )
    .await;

    println!("{}", describe(&classification, config));
    Ok(())
}

fn describe(classification: &Classification, config: &AppConfig) -> String {
    match classification {
        Classification::Actionable(verdict) => format!(
            "Would file: {summary}\nType: {issue_type}\nPriority: {priority}\nConfidence: {confidence:.2}\nReasoning: {reasoning}",
            summary = verdict.summary,
            issue_type = verdict.issue_type.unwrap_or(config.jira.default_issue_type),
            priority = verdict.priority.unwrap_or(config.jira.default_priority),
            confidence = verdict.confidence,
            reasoning = verdict.reasoning,
        ),
        Classification::Declined(verdict) => format!(
            "No ticket needed (confidence {:.2})\nReasoning: {}",
            verdict.confidence, verdict.reasoning
        ),
        Classification::BelowThreshold { verdict, threshold } => format!(
            "Not filed: confidence {:.2} is below {threshold}\nSummary: {}",
            verdict.confidence, verdict.summary
        ),
        Classification::Unparseable(reason) => {
            format!("Could not read the model's answer: {reason}")
        }
        Classification::Unavailable(reason) => format!("Model unavailable: {reason}"),
    }
}
