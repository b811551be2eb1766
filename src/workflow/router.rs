use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::domain::message::{InboundMessage, MessageEvent};
use crate::workflow::classifier::{self, Classification};
use crate::workflow::ticket::{self, FiledTicket};

#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    Subtype(String),
    BotMessage,
    OwnMessage,
    NoAuthor,
    BlankText,
    UnmonitoredChannel(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    ChannelLookupFailed(String),
    Processed(ProcessOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    NotFiled(Classification),
    Filed(FiledTicket),
    /// Classified as actionable but the issue could not be created.
    Failed(String),
}

/// Runs one chat event through the pipeline. Every failure ends here as an
/// outcome, so the caller can move on to the next event.
pub async fn dispatch(ctx: &AppContext, event: &MessageEvent) -> DispatchOutcome {
    let author = match admit(event, ctx.bot_user_id.as_deref()) {
        Ok(author) => author,
        Err(reason) => {
            debug!(channel = %event.channel, ts = %event.ts, ?reason, "ignoring event");
            return DispatchOutcome::Ignored(reason);
        }
    };

    let channel_name = match ctx.chat.channel_name(&event.channel).await {
        Ok(name) => name,
        Err(err) => {
            error!(channel = %event.channel, error = %err, "could not resolve channel");
            return DispatchOutcome::ChannelLookupFailed(err.to_string());
        }
    };

    if !ctx.config.slack.is_monitored(&channel_name) {
        debug!(channel = %channel_name, "channel is not monitored");
        return DispatchOutcome::Ignored(IgnoreReason::UnmonitoredChannel(channel_name));
    }

    debug!(
        channel = %channel_name,
        ts = %event.ts,
        thread = event.thread_ts.as_deref().unwrap_or("none"),
        "admitted message"
    );
    let message = InboundMessage::from_event(event, author, &channel_name);
    DispatchOutcome::Processed(process_message(ctx, &message).await)
}

/// Checks the event's own fields and returns its author when the event is a
/// plain human message.
pub fn admit<'a>(
    event: &'a MessageEvent,
    bot_user_id: Option<&str>,
) -> Result<&'a str, IgnoreReason> {
    if let Some(subtype) = &event.subtype {
        return Err(IgnoreReason::Subtype(subtype.clone()));
    }
    if event.bot_id.is_some() {
        return Err(IgnoreReason::BotMessage);
    }
    let Some(author) = event.user.as_deref() else {
        return Err(IgnoreReason::NoAuthor);
    };
    if bot_user_id == Some(author) {
        return Err(IgnoreReason::OwnMessage);
    }
    if event.text.trim().is_empty() {
        return Err(IgnoreReason::BlankText);
    }
    Ok(author)
}

pub async fn process_message(ctx: &AppContext, message: &InboundMessage) -> ProcessOutcome {
    info!(
        channel = %message.channel_name,
        author = %message.author_id,
        ts = %message.timestamp,
        "processing message"
    );

    let classification = classifier::classify(
        ctx.language_model.as_ref(),
        &message.text,
        ctx.config.ai.detection_mode,
        ctx.config.ai.confidence_threshold,
    )
    .await;

    let Some(verdict) = classification.ticket() else {
        match &classification {
            Classification::BelowThreshold { verdict, threshold } => info!(
                confidence = verdict.confidence,
                threshold, "confidence below threshold; not filing"
            ),
            Classification::Declined(verdict) => {
                debug!(reasoning = %verdict.reasoning, "no ticket needed")
            }
            _ => {}
        }
        return ProcessOutcome::NotFiled(classification);
    };

    match ticket::file_ticket(ctx, message, verdict).await {
        Ok(filed) => ProcessOutcome::Filed(filed),
        Err(err) => {
            warn!(
                channel = %message.channel_name,
                ts = %message.timestamp,
                error = %err,
                "could not file ticket"
            );
            ProcessOutcome::Failed(err.to_string())
        }
    }
}
