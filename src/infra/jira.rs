use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, Method, RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ticket::{CreatedIssue, TicketDraft, Transition};
use crate::domain::verdict::{IssueType, Priority};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

const PRIORITY_FIELD: &str = "priority";
const CREATE_META_PAGE_SIZE: u32 = 200;

pub struct JiraClient {
    http: Client,
    base_url: String,
    email: String,
    token: SecretString,
}

impl JiraClient {
    pub fn new(base_url: &str, email: String, token: SecretString) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email,
            token,
        }
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.email, self.token.expose_secret());
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/api/3/{path}", self.base_url))
            .header(AUTHORIZATION, self.auth_header())
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> AppResult<Response> {
        let response = request.send().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to call Jira to {action}: {err}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::IssueTracker(format!(
                "Jira responded with {status} while trying to {action}: {body}"
            )));
        }

        Ok(response)
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        action: &str,
    ) -> AppResult<T> {
        let response = self.send(self.request(Method::GET, path), action).await?;
        response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse Jira response to {action}: {err}"))
        })
    }

    fn browse_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn create_issue(
        &self,
        project_key: &str,
        draft: &TicketDraft,
        priority: Option<Priority>,
    ) -> AppResult<CreatedIssue> {
        let project_key = project_key.trim();
        if project_key.is_empty() {
            return Err(AppError::IssueTracker(
                "project key must not be empty".to_string(),
            ));
        }
        if draft.summary.trim().is_empty() {
            return Err(AppError::IssueTracker(
                "issue summary must not be empty".to_string(),
            ));
        }

        let request_body = JiraCreateIssueRequest::new(project_key, draft, priority);
        let request = self
            .request(Method::POST, "issue")
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body);

        let response = self.send(request, "create an issue").await?;
        let payload: JiraCreateIssueResponse = response.json().await.map_err(|err| {
            AppError::IssueTracker(format!("failed to parse Jira response: {err}"))
        })?;

        let url = self.browse_url(&payload.key);
        Ok(CreatedIssue {
            key: payload.key,
            url,
            status: None,
        })
    }

    async fn supports_priority(&self, project_key: &str, issue_type: IssueType) -> AppResult<bool> {
        let types: JiraCreateMetaIssueTypes = self
            .fetch(
                &format!(
                    "issue/createmeta/{project_key}/issuetypes?maxResults={CREATE_META_PAGE_SIZE}"
                ),
                "list issue types",
            )
            .await?;

        let Some(meta) = types
            .issue_types
            .iter()
            .find(|meta| meta.name.eq_ignore_ascii_case(issue_type.as_str()))
        else {
            return Err(AppError::IssueTracker(format!(
                "issue type {issue_type} is not available in project {project_key}"
            )));
        };

        let fields: JiraCreateMetaFields = self
            .fetch(
                &format!(
                    "issue/createmeta/{project_key}/issuetypes/{}?maxResults={CREATE_META_PAGE_SIZE}",
                    meta.id
                ),
                "list create fields",
            )
            .await?;

        let supported = fields
            .fields
            .iter()
            .any(|field| field.field_id == PRIORITY_FIELD);
        debug!(project_key, issue_type = %issue_type, supported, "checked priority support");
        Ok(supported)
    }

    async fn issue_status(&self, key: &str) -> AppResult<String> {
        let issue: JiraIssueStatusResponse = self
            .fetch(&format!("issue/{key}?fields=status"), "read issue status")
            .await?;
        Ok(issue.fields.status.name)
    }

    async fn transitions(&self, key: &str) -> AppResult<Vec<Transition>> {
        let payload: JiraTransitionsResponse = self
            .fetch(&format!("issue/{key}/transitions"), "list transitions")
            .await?;

        Ok(payload
            .transitions
            .into_iter()
            .map(|transition| Transition {
                id: transition.id,
                name: transition.name,
                to_status: transition.to.name,
            })
            .collect())
    }

    async fn transition_issue(&self, key: &str, transition_id: &str) -> AppResult<()> {
        let body = JiraTransitionRequest {
            transition: JiraTransitionId {
                id: transition_id.to_string(),
            },
        };
        let request = self
            .request(Method::POST, &format!("issue/{key}/transitions"))
            .header(CONTENT_TYPE, "application/json")
            .json(&body);

        self.send(request, "transition an issue").await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JiraCreateIssueRequest {
    fields: JiraCreateIssueFields,
}

impl JiraCreateIssueRequest {
    fn new(project_key: &str, draft: &TicketDraft, priority: Option<Priority>) -> Self {
        Self {
            fields: JiraCreateIssueFields {
                project: JiraProject {
                    key: project_key.to_string(),
                },
                summary: draft.summary.trim().to_string(),
                description: JiraDescription::from_text(&draft.description),
                issuetype: JiraNamed::new(draft.issue_type.as_str()),
                priority: priority.map(|priority| JiraNamed::new(priority.as_str())),
            },
        }
    }
}

#[derive(Serialize)]
struct JiraCreateIssueFields {
    project: JiraProject,
    summary: String,
    description: JiraDescription,
    issuetype: JiraNamed,
    #[serde(skip_serializing_if = "Option::is_none")]
    priority: Option<JiraNamed>,
}

#[derive(Serialize)]
struct JiraProject {
    key: String,
}

#[derive(Serialize)]
struct JiraNamed {
    name: String,
}

impl JiraNamed {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// Atlassian Document Format body for the description field.
#[derive(Serialize)]
struct JiraDescription {
    #[serde(rename = "type")]
    doc_type: &'static str,
    version: u8,
    content: Vec<JiraDocNode>,
}

impl JiraDescription {
    fn from_text(description: &str) -> Self {
        let cleaned = description.replace('\r', "");
        let mut content = cleaned
            .split("\n\n")
            .map(|section| section.trim())
            .filter(|section| !section.is_empty())
            .map(JiraDocNode::from_section)
            .collect::<Vec<_>>();

        if content.is_empty() {
            content.push(JiraDocNode::paragraph("No description provided."));
        }

        Self {
            doc_type: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum JiraDocNode {
    Paragraph { content: Vec<JiraDocInline> },
    Blockquote { content: Vec<JiraDocNode> },
    Rule,
}

impl JiraDocNode {
    fn from_section(section: &str) -> Self {
        if section == "---" {
            return JiraDocNode::Rule;
        }

        let is_quote = section.lines().all(|line| line.starts_with('>'));
        if is_quote {
            let unquoted = section
                .lines()
                .map(|line| {
                    let line = line.trim_start_matches('>');
                    line.strip_prefix(' ').unwrap_or(line)
                })
                .collect::<Vec<_>>()
                .join("\n");
            return JiraDocNode::Blockquote {
                content: vec![JiraDocNode::paragraph(&unquoted)],
            };
        }

        JiraDocNode::paragraph(section)
    }

    fn paragraph(text: &str) -> Self {
        let mut content = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if index > 0 {
                content.push(JiraDocInline::HardBreak);
            }
            if !line.is_empty() {
                content.push(JiraDocInline::Text {
                    text: line.to_string(),
                });
            }
        }
        JiraDocNode::Paragraph { content }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum JiraDocInline {
    Text { text: String },
    HardBreak,
}

#[derive(Deserialize)]
struct JiraCreateIssueResponse {
    key: String,
}

#[derive(Deserialize)]
struct JiraCreateMetaIssueTypes {
    #[serde(rename = "issueTypes", alias = "values", default)]
    issue_types: Vec<JiraCreateMetaIssueType>,
}

#[derive(Deserialize)]
struct JiraCreateMetaIssueType {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct JiraCreateMetaFields {
    #[serde(alias = "values", alias = "results", default)]
    fields: Vec<JiraCreateMetaField>,
}

#[derive(Deserialize)]
struct JiraCreateMetaField {
    #[serde(rename = "fieldId")]
    field_id: String,
}

#[derive(Deserialize)]
struct JiraIssueStatusResponse {
    fields: JiraStatusFields,
}

#[derive(Deserialize)]
struct JiraStatusFields {
    status: JiraStatus,
}

#[derive(Deserialize)]
struct JiraStatus {
    name: String,
}

#[derive(Deserialize)]
struct JiraTransitionsResponse {
    #[serde(default)]
    transitions: Vec<JiraTransition>,
}

#[derive(Deserialize)]
struct JiraTransition {
    id: String,
    #[serde(default)]
    name: String,
    to: JiraStatus,
}

#[derive(Serialize)]
struct JiraTransitionRequest {
    transition: JiraTransitionId,
}

#[derive(Serialize)]
struct JiraTransitionId {
    id: String,
}
