//! Scripted scoring model for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use groq_client::{ChatRequest, GroqError};

use super::traits::BaseScoringModel;

/// Canned-response model. Each call pops the next scripted outcome;
/// an exhausted script fails loudly instead of hanging a test.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, GroqError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_content(self, content: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Ok(content.into()));
        self
    }

    pub fn then_error(self, error: GroqError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Content of the user message in the most recent request.
    pub fn last_user_prompt(&self) -> Option<String> {
        let requests = self.requests.lock().unwrap();
        let request = requests.last()?;
        request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl BaseScoringModel for ScriptedModel {
    async fn complete(&self, request: ChatRequest) -> Result<String, GroqError> {
        self.requests.lock().unwrap().push(request);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GroqError::Parse("scripted model exhausted".to_string())))
    }
}
