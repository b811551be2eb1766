use tracing::{error, info};

use crate::domain::message::InboundMessage;
use crate::domain::ticket::CreatedIssue;
use crate::services::{ChatService, OutgoingMessage};

pub const EXCERPT_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationOutcome {
    pub broadcast: Delivery,
    pub thread_reply: Delivery,
}

/// Announces `issue` in the notification channel and replies in the
/// message's thread. Each post is attempted once, independently.
pub async fn notify(
    chat: &dyn ChatService,
    notification_channel: &str,
    issue: &CreatedIssue,
    message: &InboundMessage,
) -> NotificationOutcome {
    let broadcast = OutgoingMessage::new(notification_channel, broadcast_text(issue, message))
        .without_unfurl();
    let reply = OutgoingMessage::new(&message.channel_id, reply_text(issue))
        .in_thread(&message.timestamp);

    let outcome = NotificationOutcome {
        broadcast: deliver(chat, &broadcast, &issue.key).await,
        thread_reply: deliver(chat, &reply, &issue.key).await,
    };
    if outcome.broadcast == Delivery::Sent && outcome.thread_reply == Delivery::Sent {
        info!(key = %issue.key, "sent notifications");
    }
    outcome
}

async fn deliver(chat: &dyn ChatService, message: &OutgoingMessage, key: &str) -> Delivery {
    match chat.post_message(message).await {
        Ok(()) => Delivery::Sent,
        Err(err) => {
            error!(
                key,
                channel = %message.channel,
                threaded = message.thread_ts.is_some(),
                error = %err,
                "failed to send notification"
            );
            Delivery::Failed(err.to_string())
        }
    }
}

fn broadcast_text(issue: &CreatedIssue, message: &InboundMessage) -> String {
    format!(
        ":white_check_mark: *Jira Ticket Created*\n\n\
         *Ticket:* <{url}|{key}>\n\
         *From:* <#{channel_id}|{channel_name}> by <@{author}>\n\
         *Original Message:*\n```{excerpt}```",
        url = issue.url,
        key = issue.key,
        channel_id = message.channel_id,
        channel_name = message.channel_name,
        author = message.author_id,
        excerpt = excerpt(&message.text, EXCERPT_LIMIT),
    )
}

fn reply_text(issue: &CreatedIssue) -> String {
    format!(":ticket: Created Jira ticket: <{}|{}>", issue.url, issue.key)
}

/// At most `limit` characters of `text`, with `...` appended when cut.
pub fn excerpt(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChat;

    fn issue() -> CreatedIssue {
        CreatedIssue {
            key: "OPS-42".to_string(),
            url: "https://example.atlassian.net/browse/OPS-42".to_string(),
            status: None,
        }
    }

    fn message(text: &str) -> InboundMessage {
        InboundMessage {
            channel_id: "C024BE91L".to_string(),
            channel_name: "bugs".to_string(),
            author_id: "U2147483697".to_string(),
            text: text.to_string(),
            timestamp: "1355517523.000005".to_string(),
        }
    }

    #[test]
    fn long_text_is_cut_at_limit() {
        let text = "x".repeat(250);
        let cut = excerpt(&text, EXCERPT_LIMIT);

        assert_eq!(cut, format!("{}...", "x".repeat(200)));
    }

    #[test]
    fn short_text_is_kept_whole() {
        let text = "y".repeat(150);
        assert_eq!(excerpt(&text, EXCERPT_LIMIT), text);
        assert_eq!(excerpt(&"z".repeat(200), EXCERPT_LIMIT), "z".repeat(200));
    }

    #[test]
    fn excerpt_counts_characters_not_bytes() {
        let text = "ü".repeat(201);
        let cut = excerpt(&text, EXCERPT_LIMIT);

        assert_eq!(cut.chars().count(), 203);
        assert!(cut.ends_with("ü..."));
    }

    #[tokio::test]
    async fn posts_broadcast_and_thread_reply() {
        let chat = MockChat::new();
        let outcome = notify(
            &chat,
            "jira-tickets",
            &issue(),
            &message("the export button crashes"),
        )
        .await;

        assert_eq!(
            outcome,
            NotificationOutcome {
                broadcast: Delivery::Sent,
                thread_reply: Delivery::Sent,
            }
        );

        let posted = chat.posted();
        assert_eq!(posted.len(), 2);

        assert_eq!(posted[0].channel, "jira-tickets");
        assert!(posted[0].thread_ts.is_none());
        assert!(!posted[0].unfurl_links);
        assert!(posted[0].text.contains("<https://example.atlassian.net/browse/OPS-42|OPS-42>"));
        assert!(posted[0].text.contains("<#C024BE91L|bugs> by <@U2147483697>"));
        assert!(posted[0].text.contains("```the export button crashes```"));

        assert_eq!(posted[1].channel, "C024BE91L");
        assert_eq!(posted[1].thread_ts.as_deref(), Some("1355517523.000005"));
        assert!(posted[1].text.contains("OPS-42"));
    }

    #[tokio::test]
    async fn broadcast_failure_does_not_stop_thread_reply() {
        let chat = MockChat::new().failing_posts_to("jira-tickets");
        let outcome = notify(&chat, "jira-tickets", &issue(), &message("it broke")).await;

        assert!(matches!(outcome.broadcast, Delivery::Failed(_)));
        assert_eq!(outcome.thread_reply, Delivery::Sent);
        assert_eq!(chat.posted().len(), 1);
    }

    #[tokio::test]
    async fn broadcast_uses_truncated_excerpt() {
        let chat = MockChat::new();
        notify(&chat, "jira-tickets", &issue(), &message(&"a".repeat(250))).await;

        let broadcast = &chat.posted()[0].text;
        assert!(broadcast.contains(&format!("```{}...```", "a".repeat(200))));
    }
}
