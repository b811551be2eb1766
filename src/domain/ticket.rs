use chrono::{DateTime, Utc};

use crate::domain::verdict::{ClassificationVerdict, IssueType, Priority};

#[derive(Debug, Clone, PartialEq)]
pub struct TicketDraft {
    pub summary: String,
    pub description: String,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub reporter_name: String,
    pub reporter_email: String,
    pub channel_name: String,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

/// Where a draft came from; everything the builder needs beyond the verdict.
#[derive(Debug, Clone)]
pub struct TicketOrigin {
    pub reporter_name: String,
    pub reporter_email: String,
    pub channel_name: String,
    pub original_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct TicketDefaults {
    pub issue_type: IssueType,
    pub priority: Priority,
}

impl TicketDraft {
    pub fn from_verdict(
        verdict: &ClassificationVerdict,
        origin: &TicketOrigin,
        defaults: TicketDefaults,
    ) -> Self {
        Self {
            summary: verdict.summary.trim().to_string(),
            description: render_description(verdict, origin),
            issue_type: verdict.issue_type.unwrap_or(defaults.issue_type),
            priority: verdict.priority.unwrap_or(defaults.priority),
            reporter_name: origin.reporter_name.clone(),
            reporter_email: origin.reporter_email.clone(),
            channel_name: origin.channel_name.clone(),
            original_text: origin.original_text.clone(),
            created_at: origin.created_at,
        }
    }
}

// Sections are separated by blank lines; the tracker adapter turns quoted
// sections into a blockquote and `---` into a rule.
fn render_description(verdict: &ClassificationVerdict, origin: &TicketOrigin) -> String {
    let quoted = origin
        .original_text
        .replace('\r', "")
        .trim()
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let generated = match verdict.description.trim() {
        "" => "No description provided.",
        text => text,
    };

    format!(
        "Reported by: {name} ({email})\nSlack channel: #{channel}\n\n\
         Original message:\n\n{quoted}\n\n---\n\n\
         AI-generated description:\n\n{generated}\n\n---\n\n\
         This ticket was created automatically by hark on {created}.",
        name = origin.reporter_name,
        email = origin.reporter_email,
        channel = origin.channel_name,
        created = origin.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedIssue {
    pub key: String,
    pub url: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to_status: String,
}
