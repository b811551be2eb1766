use tracing::{debug, error, info, warn};

use crate::domain::ticket::CreatedIssue;
use crate::services::IssueTrackerService;

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    AlreadyInStatus(String),
    Transitioned { from: String, to: String },
    /// No available transition leads to the desired status.
    Unavailable {
        current: String,
        available: Vec<String>,
    },
    Failed(String),
}

/// Moves `issue` to `desired` if the workflow allows it. Never fails the
/// caller: the issue already exists whatever happens here.
pub async fn apply_transition(
    tracker: &dyn IssueTrackerService,
    issue: &mut CreatedIssue,
    desired: &str,
) -> TransitionOutcome {
    let current = match tracker.issue_status(&issue.key).await {
        Ok(status) => status,
        Err(err) => {
            error!(key = %issue.key, error = %err, "could not read issue status");
            return TransitionOutcome::Failed(err.to_string());
        }
    };
    issue.status = Some(current.clone());

    if current.eq_ignore_ascii_case(desired) {
        debug!(key = %issue.key, status = %current, "issue already in desired status");
        return TransitionOutcome::AlreadyInStatus(current);
    }

    let transitions = match tracker.transitions(&issue.key).await {
        Ok(transitions) => transitions,
        Err(err) => {
            error!(key = %issue.key, error = %err, "could not list transitions");
            return TransitionOutcome::Failed(err.to_string());
        }
    };

    let Some(transition) = transitions
        .iter()
        .find(|transition| transition.to_status.eq_ignore_ascii_case(desired))
    else {
        let available = transitions
            .iter()
            .map(|transition| transition.to_status.clone())
            .collect::<Vec<_>>();
        warn!(
            key = %issue.key,
            current = %current,
            desired,
            available = %available.join(", "),
            "no transition leads to the desired status"
        );
        return TransitionOutcome::Unavailable { current, available };
    };

    match tracker.transition_issue(&issue.key, &transition.id).await {
        Ok(()) => {
            info!(
                key = %issue.key,
                transition = %transition.name,
                from = %current,
                to = %transition.to_status,
                "transitioned issue"
            );
            issue.status = Some(transition.to_status.clone());
            TransitionOutcome::Transitioned {
                from: current,
                to: transition.to_status.clone(),
            }
        }
        Err(err) => {
            error!(key = %issue.key, error = %err, "transition failed");
            TransitionOutcome::Failed(err.to_string())
        }
    }
}
