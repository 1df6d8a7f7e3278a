//! Session log of every question shown, fed back into generation prompts.

use crate::store::{KeyValueStore, StoreResult};
use serde_json::Value;
use std::sync::Arc;

/// Key under which the session log is stored
pub const SESSION_LOG_KEY: &str = "used_questions_session";

/// Append-only log of questions shown this session
#[derive(Clone)]
pub struct SessionLog {
    store: Arc<dyn KeyValueStore>,
}

impl SessionLog {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Append a question; duplicates are recorded as-is
    pub async fn record(&self, question: &str) -> StoreResult<()> {
        let mut log = self.all().await?;
        log.push(question.to_string());
        self.store.set(SESSION_LOG_KEY, Value::from(log)).await
    }

    /// Everything recorded this session, oldest first
    pub async fn all(&self) -> StoreResult<Vec<String>> {
        Ok(match self.store.get(SESSION_LOG_KEY).await? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable session log: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        })
    }
}
