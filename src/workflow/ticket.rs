use chrono::Utc;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::domain::message::InboundMessage;
use crate::domain::ticket::{CreatedIssue, TicketDraft, TicketOrigin};
use crate::domain::verdict::ClassificationVerdict;
use crate::error::AppResult;
use crate::services::IssueTrackerService;
use crate::workflow::notifier::{self, NotificationOutcome};
use crate::workflow::transition::{self, TransitionOutcome};

const UNKNOWN_EMAIL: &str = "unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct FiledTicket {
    pub issue: CreatedIssue,
    /// `None` when no initial status is configured.
    pub transition: Option<TransitionOutcome>,
    pub notification: NotificationOutcome,
}

/// Files `verdict` as an issue, moves it to the configured status and
/// announces it. Only a failed create is an error; later steps report
/// their outcome instead.
pub async fn file_ticket(
    ctx: &AppContext,
    message: &InboundMessage,
    verdict: &ClassificationVerdict,
) -> AppResult<FiledTicket> {
    let origin = reporter_origin(ctx, message).await;
    let draft = TicketDraft::from_verdict(verdict, &origin, ctx.config.jira.ticket_defaults());

    let mut issue = create_issue(
        ctx.issue_tracker.as_ref(),
        &ctx.config.jira.project_key,
        &draft,
    )
    .await?;
    info!(key = %issue.key, summary = %draft.summary, "created issue");

    let transition = match ctx.config.jira.desired_status() {
        Some(desired) => Some(
            transition::apply_transition(ctx.issue_tracker.as_ref(), &mut issue, desired).await,
        ),
        None => None,
    };

    let notification = notifier::notify(
        ctx.chat.as_ref(),
        &ctx.config.slack.notification_channel,
        &issue,
        message,
    )
    .await;

    Ok(FiledTicket {
        issue,
        transition,
        notification,
    })
}

/// Creates the issue, sending the priority only when the project's create
/// screen accepts one.
pub async fn create_issue(
    tracker: &dyn IssueTrackerService,
    project_key: &str,
    draft: &TicketDraft,
) -> AppResult<CreatedIssue> {
    let priority = match tracker.supports_priority(project_key, draft.issue_type).await {
        Ok(true) => Some(draft.priority),
        Ok(false) => {
            info!(
                project_key,
                issue_type = %draft.issue_type,
                "project does not accept a priority; creating without one"
            );
            None
        }
        Err(err) => {
            warn!(
                project_key,
                error = %err,
                "could not check priority support; creating without a priority"
            );
            None
        }
    };

    tracker.create_issue(project_key, draft, priority).await
}

async fn reporter_origin(ctx: &AppContext, message: &InboundMessage) -> TicketOrigin {
    let (reporter_name, reporter_email) = match ctx.chat.user_profile(&message.author_id).await {
        Ok(profile) => (
            profile.real_name,
            profile.email.unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
        ),
        Err(err) => {
            warn!(user = %message.author_id, error = %err, "could not look up reporter");
            (message.author_id.clone(), UNKNOWN_EMAIL.to_string())
        }
    };

    TicketOrigin {
        reporter_name,
        reporter_email,
        channel_name: message.channel_name.clone(),
        original_text: message.text.clone(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::verdict::{IssueType, Priority};
    use crate::testing::{MockChat, MockModel, MockTracker, PrioritySupport, context, test_config};
    use crate::workflow::notifier::Delivery;

    fn verdict() -> ClassificationVerdict {
        ClassificationVerdict {
            should_file: true,
            confidence: 0.9,
            issue_type: Some(IssueType::Bug),
            summary: "Export button returns 500".to_string(),
            description: "Export fails with HTTP 500.".to_string(),
            priority: Some(Priority::High),
            reasoning: "error report".to_string(),
        }
    }

    fn message() -> InboundMessage {
        InboundMessage {
            channel_id: "C1".to_string(),
            channel_name: "bugs".to_string(),
            author_id: "U1".to_string(),
            text: "the export button crashes with a 500 error".to_string(),
            timestamp: "1700000000.000100".to_string(),
        }
    }

    fn chat() -> MockChat {
        MockChat::new().with_user("U1", "Ada Lovelace", Some("ada@example.com"))
    }

    #[tokio::test]
    async fn files_issue_with_verdict_fields() {
        let chat = Arc::new(chat());
        let tracker = Arc::new(MockTracker::new());
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(test_config(), &chat, &tracker, &model);

        let filed = file_ticket(&ctx, &message(), &verdict()).await.expect("filed");

        let created = tracker.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].project_key, "OPS");
        assert_eq!(created[0].draft.summary, "Export button returns 500");
        assert_eq!(created[0].draft.issue_type, IssueType::Bug);
        assert_eq!(created[0].priority, Some(Priority::High));
        assert!(created[0]
            .draft
            .description
            .contains("Reported by: Ada Lovelace (ada@example.com)"));

        assert_eq!(filed.issue.key, "OPS-1");
        assert_eq!(filed.transition, None);
        assert_eq!(filed.notification.broadcast, Delivery::Sent);
        assert_eq!(filed.notification.thread_reply, Delivery::Sent);
    }

    #[tokio::test]
    async fn unsupported_priority_is_left_out() {
        let tracker = MockTracker::new().with_priority(PrioritySupport::Unsupported);
        let draft = TicketDraft::from_verdict(
            &verdict(),
            &TicketOrigin {
                reporter_name: "Ada".to_string(),
                reporter_email: "ada@example.com".to_string(),
                channel_name: "bugs".to_string(),
                original_text: "it broke".to_string(),
                created_at: Utc::now(),
            },
            test_config().jira.ticket_defaults(),
        );

        create_issue(&tracker, "OPS", &draft).await.expect("created");

        assert_eq!(tracker.created()[0].priority, None);
    }

    #[tokio::test]
    async fn failed_capability_check_still_creates() {
        let chat = Arc::new(chat());
        let tracker = Arc::new(MockTracker::new().with_priority(PrioritySupport::Unknown));
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(test_config(), &chat, &tracker, &model);

        file_ticket(&ctx, &message(), &verdict()).await.expect("filed");

        let created = tracker.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].priority, None);
    }

    #[tokio::test]
    async fn missing_verdict_fields_use_defaults() {
        let chat = Arc::new(chat());
        let tracker = Arc::new(MockTracker::new());
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(test_config(), &chat, &tracker, &model);
        let verdict = ClassificationVerdict {
            issue_type: None,
            priority: None,
            ..verdict()
        };

        file_ticket(&ctx, &message(), &verdict).await.expect("filed");

        let created = tracker.created();
        assert_eq!(created[0].draft.issue_type, IssueType::Task);
        assert_eq!(created[0].priority, Some(Priority::Medium));
    }

    #[tokio::test]
    async fn unknown_reporter_falls_back_to_author_id() {
        let chat = Arc::new(MockChat::new());
        let tracker = Arc::new(MockTracker::new());
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(test_config(), &chat, &tracker, &model);

        file_ticket(&ctx, &message(), &verdict()).await.expect("filed");

        let draft = &tracker.created()[0].draft;
        assert_eq!(draft.reporter_name, "U1");
        assert_eq!(draft.reporter_email, "unknown");
    }

    #[tokio::test]
    async fn transitions_when_initial_status_configured() {
        let mut config = test_config();
        config.jira.initial_status = Some("To Do".to_string());
        let chat = Arc::new(chat());
        let tracker = Arc::new(
            MockTracker::new()
                .with_status("Backlog")
                .with_transition("11", "To Do"),
        );
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(config, &chat, &tracker, &model);

        let filed = file_ticket(&ctx, &message(), &verdict()).await.expect("filed");

        assert_eq!(
            filed.transition,
            Some(TransitionOutcome::Transitioned {
                from: "Backlog".to_string(),
                to: "To Do".to_string(),
            })
        );
        assert_eq!(filed.issue.status.as_deref(), Some("To Do"));
    }

    #[tokio::test]
    async fn failed_create_is_an_error_and_sends_nothing() {
        let chat = Arc::new(chat());
        let tracker = Arc::new(MockTracker::new().failing_create());
        let model = Arc::new(MockModel::answering("{}"));
        let ctx = context(test_config(), &chat, &tracker, &model);

        let result = file_ticket(&ctx, &message(), &verdict()).await;

        assert!(result.is_err());
        assert!(chat.posted().is_empty());
    }
}
