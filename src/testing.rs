//! Recording fakes of the service traits, shared by the workflow tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::ticket::{CreatedIssue, TicketDraft, Transition};
use crate::domain::verdict::{IssueType, Priority};
use crate::error::{AppError, AppResult};
use crate::services::{
    ChatService, IssueTrackerService, LanguageModelService, OutgoingMessage, UserProfile,
};

pub const TEST_CONFIG: &str = r#"
slack:
  monitored_channels: [bugs, support]
  notification_channel: jira-tickets
jira:
  url: https://example.atlassian.net
  project_key: OPS
  default_issue_type: Task
  default_priority: Medium
ai:
  model: claude-test
  detection_mode: liberal
  confidence_threshold: 0.7
"#;

pub fn test_config() -> AppConfig {
    AppConfig::from_yaml(TEST_CONFIG).expect("test config is valid")
}

pub fn context(
    config: AppConfig,
    chat: &Arc<MockChat>,
    tracker: &Arc<MockTracker>,
    model: &Arc<MockModel>,
) -> AppContext {
    AppContext::new(
        config,
        Some("U0BOT".to_string()),
        chat.clone(),
        tracker.clone(),
        model.clone(),
    )
}

#[derive(Default)]
pub struct MockChat {
    channels: HashMap<String, String>,
    users: HashMap<String, UserProfile>,
    failing_channels: Vec<String>,
    posted: Mutex<Vec<OutgoingMessage>>,
    channel_lookups: Mutex<usize>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: &str, name: &str) -> Self {
        self.channels.insert(id.to_string(), name.to_string());
        self
    }

    pub fn with_user(mut self, id: &str, real_name: &str, email: Option<&str>) -> Self {
        self.users.insert(
            id.to_string(),
            UserProfile {
                real_name: real_name.to_string(),
                email: email.map(str::to_string),
            },
        );
        self
    }

    /// Posts to `channel` fail.
    pub fn failing_posts_to(mut self, channel: &str) -> Self {
        self.failing_channels.push(channel.to_string());
        self
    }

    pub fn posted(&self) -> Vec<OutgoingMessage> {
        self.posted.lock().unwrap().clone()
    }

    pub fn channel_lookups(&self) -> usize {
        *self.channel_lookups.lock().unwrap()
    }
}

#[async_trait]
impl ChatService for MockChat {
    async fn channel_name(&self, channel_id: &str) -> AppResult<String> {
        *self.channel_lookups.lock().unwrap() += 1;
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| {
                AppError::Chat("conversations.info failed: channel_not_found".to_string())
            })
    }

    async fn user_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| AppError::Chat("users.info failed: user_not_found".to_string()))
    }

    async fn post_message(&self, message: &OutgoingMessage) -> AppResult<()> {
        if self.failing_channels.contains(&message.channel) {
            return Err(AppError::Chat("chat.postMessage failed: not_in_channel".to_string()));
        }
        self.posted.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    pub project_key: String,
    pub draft: TicketDraft,
    pub priority: Option<Priority>,
}

pub enum PrioritySupport {
    Supported,
    Unsupported,
    Unknown,
}

pub struct MockTracker {
    priority: PrioritySupport,
    create_fails: bool,
    status: Mutex<String>,
    transitions: Vec<Transition>,
    transition_fails: bool,
    created: Mutex<Vec<CreateCall>>,
    transitioned: Mutex<Vec<(String, String)>>,
    status_reads: Mutex<usize>,
}

impl Default for MockTracker {
    fn default() -> Self {
        Self {
            priority: PrioritySupport::Supported,
            create_fails: false,
            status: Mutex::new("Backlog".to_string()),
            transitions: Vec::new(),
            transition_fails: false,
            created: Mutex::new(Vec::new()),
            transitioned: Mutex::new(Vec::new()),
            status_reads: Mutex::new(0),
        }
    }
}

impl MockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: PrioritySupport) -> Self {
        self.priority = priority;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.create_fails = true;
        self
    }

    pub fn with_status(self, status: &str) -> Self {
        *self.status.lock().unwrap() = status.to_string();
        self
    }

    pub fn with_transition(mut self, id: &str, to_status: &str) -> Self {
        self.transitions.push(Transition {
            id: id.to_string(),
            name: format!("Move to {to_status}"),
            to_status: to_status.to_string(),
        });
        self
    }

    pub fn failing_transition(mut self) -> Self {
        self.transition_fails = true;
        self
    }

    pub fn created(&self) -> Vec<CreateCall> {
        self.created.lock().unwrap().clone()
    }

    pub fn transitioned(&self) -> Vec<(String, String)> {
        self.transitioned.lock().unwrap().clone()
    }

    pub fn status_reads(&self) -> usize {
        *self.status_reads.lock().unwrap()
    }
}

#[async_trait]
impl IssueTrackerService for MockTracker {
    async fn create_issue(
        &self,
        project_key: &str,
        draft: &TicketDraft,
        priority: Option<Priority>,
    ) -> AppResult<CreatedIssue> {
        if self.create_fails {
            return Err(AppError::IssueTracker(
                "Jira responded with 400 Bad Request".to_string(),
            ));
        }
        let mut created = self.created.lock().unwrap();
        created.push(CreateCall {
            project_key: project_key.to_string(),
            draft: draft.clone(),
            priority,
        });
        let key = format!("{project_key}-{}", created.len());
        Ok(CreatedIssue {
            url: format!("https://example.atlassian.net/browse/{key}"),
            key,
            status: None,
        })
    }

    async fn supports_priority(
        &self,
        _project_key: &str,
        _issue_type: IssueType,
    ) -> AppResult<bool> {
        match self.priority {
            PrioritySupport::Supported => Ok(true),
            PrioritySupport::Unsupported => Ok(false),
            PrioritySupport::Unknown => Err(AppError::IssueTracker(
                "Jira responded with 403 Forbidden".to_string(),
            )),
        }
    }

    async fn issue_status(&self, _key: &str) -> AppResult<String> {
        *self.status_reads.lock().unwrap() += 1;
        Ok(self.status.lock().unwrap().clone())
    }

    async fn transitions(&self, _key: &str) -> AppResult<Vec<Transition>> {
        Ok(self.transitions.clone())
    }

    async fn transition_issue(&self, key: &str, transition_id: &str) -> AppResult<()> {
        if self.transition_fails {
            return Err(AppError::IssueTracker(
                "Jira responded with 409 Conflict".to_string(),
            ));
        }
        self.transitioned
            .lock()
            .unwrap()
            .push((key.to_string(), transition_id.to_string()));
        if let Some(transition) = self.transitions.iter().find(|t| t.id == transition_id) {
            *self.status.lock().unwrap() = transition.to_status.clone();
        }
        Ok(())
    }
}

pub struct MockModel {
    answer: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            answer: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelService for MockModel {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone().map_err(AppError::LanguageModel)
    }
}
