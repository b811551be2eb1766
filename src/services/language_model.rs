use async_trait::async_trait;

use crate::error::AppResult;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Sends a single-turn prompt and returns the model's text answer.
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}
