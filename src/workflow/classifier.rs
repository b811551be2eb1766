use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::domain::verdict::{ClassificationVerdict, DetectionMode, IssueType, Priority};
use crate::services::LanguageModelService;

pub const SUMMARY_LIMIT: usize = 100;

/// What the classifier concluded about one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Actionable(ClassificationVerdict),
    /// The model decided no ticket is needed.
    Declined(ClassificationVerdict),
    BelowThreshold {
        verdict: ClassificationVerdict,
        threshold: f64,
    },
    Unparseable(String),
    /// The model could not be reached.
    Unavailable(String),
}

impl Classification {
    /// The verdict to file, if any.
    pub fn ticket(&self) -> Option<&ClassificationVerdict> {
        match self {
            Classification::Actionable(verdict) => Some(verdict),
            _ => None,
        }
    }
}

pub async fn classify(
    model: &dyn LanguageModelService,
    text: &str,
    mode: DetectionMode,
    threshold: f64,
) -> Classification {
    let prompt = build_prompt(text, mode, threshold);

    let answer = match model.complete(&prompt).await {
        Ok(answer) => answer,
        Err(err) => {
            error!(error = %err, "classification request failed");
            return Classification::Unavailable(err.to_string());
        }
    };

    let verdict = match parse_verdict(&answer) {
        Ok(verdict) => verdict,
        Err(reason) => {
            warn!(%reason, answer = %answer, "could not parse classification");
            return Classification::Unparseable(reason);
        }
    };

    debug!(
        should_file = verdict.should_file,
        confidence = verdict.confidence,
        reasoning = %verdict.reasoning,
        "classified message"
    );

    if !verdict.should_file {
        Classification::Declined(verdict)
    } else if verdict.passes(threshold) {
        Classification::Actionable(verdict)
    } else {
        Classification::BelowThreshold { verdict, threshold }
    }
}

pub fn build_prompt(text: &str, mode: DetectionMode, threshold: f64) -> String {
    let stance = match mode {
        DetectionMode::Liberal => {
            "be generous and create tickets for anything that might need tracking"
        }
        DetectionMode::Strict => {
            "be strict and only create tickets for clear bug reports or task requests"
        }
    };

    format!(
        r#"Analyze the following Slack message and decide whether it describes a bug report, task request, or other issue that should be tracked in Jira.

Message: "{text}"

Detection mode: {mode} ({stance})

Respond with a JSON object of exactly this shape:
{{
    "should_create_ticket": true or false,
    "confidence": a number between 0.0 and 1.0,
    "issue_type": "Bug" | "Task" | "Story" | "Improvement",
    "summary": "one-line actionable summary, at most {SUMMARY_LIMIT} characters",
    "description": "detailed description built from the message",
    "priority": "Highest" | "High" | "Medium" | "Low" | "Lowest",
    "reasoning": "short explanation of the decision"
}}

Guidelines:
- Bugs: error messages, crashes, unexpected behaviour, things that stopped working.
- Tasks: requests to implement features, make changes or do work.
- Improvements: suggestions to enhance existing functionality.
- Keep the summary concise and actionable; put relevant details in the description.
- Choose the priority from urgency cues in the message.
- Tickets are only created when confidence is at least {threshold}.

Respond with ONLY the JSON object and no other text."#,
        mode = mode.as_str(),
    )
}

/// Removes a surrounding ```` ``` ```` fence and its optional language tag.
/// The closing fence is the last one, so fenced code inside JSON strings
/// survives.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    let body = &rest[tag_len..];
    let body = match body.rfind("```") {
        Some(end) => &body[..end],
        None => body,
    };
    body.trim()
}

#[derive(Deserialize)]
struct RawVerdict {
    should_create_ticket: bool,
    confidence: f64,
    #[serde(default)]
    issue_type: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

pub fn parse_verdict(raw: &str) -> Result<ClassificationVerdict, String> {
    let body = strip_code_fence(raw);
    let parsed: RawVerdict =
        serde_json::from_str(body).map_err(|err| format!("invalid verdict JSON: {err}"))?;

    if !parsed.confidence.is_finite() || !(0.0..=1.0).contains(&parsed.confidence) {
        return Err(format!(
            "confidence {} is outside 0..=1",
            parsed.confidence
        ));
    }

    let summary = parsed.summary.unwrap_or_default().trim().to_string();
    if parsed.should_create_ticket && summary.is_empty() {
        return Err("actionable verdict has no summary".to_string());
    }

    let issue_type = parsed.issue_type.as_deref().and_then(|value| {
        let parsed = IssueType::parse(value);
        if parsed.is_none() {
            debug!(issue_type = value, "unrecognised issue type; using default");
        }
        parsed
    });
    let priority = parsed.priority.as_deref().and_then(|value| {
        let parsed = Priority::parse(value);
        if parsed.is_none() {
            debug!(priority = value, "unrecognised priority; using default");
        }
        parsed
    });

    Ok(ClassificationVerdict {
        should_file: parsed.should_create_ticket,
        confidence: parsed.confidence,
        issue_type,
        summary: truncate_chars(&summary, SUMMARY_LIMIT),
        description: parsed.description.unwrap_or_default(),
        priority,
        reasoning: parsed.reasoning.unwrap_or_default(),
    })
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].trim_end().to_string(),
        None => text.to_string(),
    }
}
