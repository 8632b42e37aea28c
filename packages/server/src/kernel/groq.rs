//! Groq-backed scoring model.

use async_trait::async_trait;
use groq_client::{ChatRequest, GroqClient, GroqError};

use super::traits::BaseScoringModel;

#[async_trait]
impl BaseScoringModel for GroqClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, GroqError> {
        let response = self.chat_completion(request).await?;
        Ok(response.content)
    }
}
