use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{ChatService, IssueTrackerService, LanguageModelService};

/// Everything a message needs, built once at startup and never mutated.
#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    /// The agent's own chat user id; its messages are never classified.
    pub bot_user_id: Option<String>,
    pub chat: Arc<dyn ChatService>,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
    pub language_model: Arc<dyn LanguageModelService>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        bot_user_id: Option<String>,
        chat: Arc<dyn ChatService>,
        issue_tracker: Arc<dyn IssueTrackerService>,
        language_model: Arc<dyn LanguageModelService>,
    ) -> Self {
        Self {
            config,
            bot_user_id,
            chat,
            issue_tracker,
            language_model,
        }
    }
}
