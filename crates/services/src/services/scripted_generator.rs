//! Canned [`TextGenerator`] for tests and offline runs.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use super::claude_api::{ClaudeApiError, TextGenerator};

/// One call received by a [`ScriptedGenerator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Hands out queued answers in order and records every call. Once the queue
/// is empty each call fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<Result<String, ClaudeApiError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedGenerator {
    pub fn new(answers: impl IntoIterator<Item = Result<String, ClaudeApiError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        system: &str,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ClaudeApiError> {
        lock(&self.calls).push(RecordedCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
            max_tokens,
        });

        lock(&self.answers)
            .pop_front()
            .unwrap_or_else(|| Err(ClaudeApiError::Transport("no scripted answer left".to_string())))
    }
}
