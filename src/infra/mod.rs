pub mod anthropic;
pub mod jira;
pub mod slack;
pub mod socket_mode;
