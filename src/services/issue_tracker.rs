use async_trait::async_trait;

use crate::domain::ticket::{CreatedIssue, TicketDraft, Transition};
use crate::domain::verdict::{IssueType, Priority};
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    /// Creates the issue; `priority` is only sent when it is `Some`.
    async fn create_issue(
        &self,
        project_key: &str,
        draft: &TicketDraft,
        priority: Option<Priority>,
    ) -> AppResult<CreatedIssue>;

    /// Whether the project's create screen for `issue_type` has a priority field.
    async fn supports_priority(&self, project_key: &str, issue_type: IssueType) -> AppResult<bool>;

    async fn issue_status(&self, key: &str) -> AppResult<String>;

    async fn transitions(&self, key: &str) -> AppResult<Vec<Transition>>;

    async fn transition_issue(&self, key: &str, transition_id: &str) -> AppResult<()>;
}
