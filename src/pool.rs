//! Per-(topic, intensity) queues of pre-generated questions.
//!
//! Each pool is a FIFO list stored under a key derived from the normalized
//! topic title and the intensity level. Pools are shared by every player and
//! every session using the same store. Consumption pops from the front; an
//! empty pool is refilled with one gateway call.
//!
//! There is no locking between the emptiness check and the refill: two
//! concurrent `pop_or_refill` calls on the same empty key may both refill,
//! and the later batch overwrites the earlier one.

use crate::error::{GameError, GameResult};
use crate::gateway::{into_content, parse_question_array, ContentGateway, GatewayRequest};
use crate::prompts::question_pool_prompt;
use crate::store::KeyValueStore;
use crate::types::{IntensityLevel, Provider, Topic};
use serde_json::Value;
use std::sync::Arc;

/// Everything a refill needs besides the pool key
#[derive(Debug, Clone, Copy)]
pub struct RefillRequest<'a> {
    pub topic: &'a Topic,
    pub level: IntensityLevel,
    /// Player the questions are generated for (prompt context only)
    pub player: &'a str,
    /// Questions already shown this session; steers generation away from them
    pub recently_used: &'a [String],
    pub credential: &'a str,
    pub provider: Provider,
}

/// Case-fold a topic title and drop everything but letters and digits
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Store key for a (topic, level) pool
pub fn pool_key(title: &str, level: IntensityLevel) -> String {
    format!("pool:{}:{}", normalize_title(title), level)
}

/// Question pool cache over a durable store
#[derive(Clone)]
pub struct QuestionPool {
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<dyn ContentGateway>,
    pool_size: usize,
}

impl QuestionPool {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        gateway: Arc<dyn ContentGateway>,
        pool_size: usize,
    ) -> Self {
        Self {
            store,
            gateway,
            pool_size,
        }
    }

    /// Current queue for a key, oldest first
    pub async fn peek(&self, title: &str, level: IntensityLevel) -> GameResult<Vec<String>> {
        let key = pool_key(title, level);
        Ok(match self.store.get(&key).await? {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable pool {}: {}", key, e);
                Vec::new()
            }),
            None => Vec::new(),
        })
    }

    async fn save(&self, title: &str, level: IntensityLevel, questions: Vec<String>) -> GameResult<()> {
        self.store
            .set(&pool_key(title, level), Value::from(questions))
            .await?;
        Ok(())
    }

    /// Remove and return the first queued question, if any. Never calls the gateway.
    pub async fn try_pop(&self, title: &str, level: IntensityLevel) -> GameResult<Option<String>> {
        let mut queue = self.peek(title, level).await?;
        if queue.is_empty() {
            return Ok(None);
        }

        let question = queue.remove(0);
        self.save(title, level, queue).await?;
        Ok(Some(question))
    }

    /// Request a fresh batch from the gateway and replace the pool with it.
    ///
    /// Stores at most `pool_size` questions; a short batch is kept as is. On any
    /// gateway or format failure nothing is written. Returns the stored count.
    pub async fn refill(&self, request: RefillRequest<'_>) -> GameResult<usize> {
        let title = &request.topic.title;
        let prompt = question_pool_prompt(
            request.topic,
            request.player,
            request.level,
            self.pool_size,
            request.recently_used,
        );

        tracing::info!(
            "Refilling question pool for '{}' at {} via {}",
            title,
            request.level,
            request.provider
        );

        let response = self
            .gateway
            .generate(GatewayRequest {
                credential: request.credential.to_string(),
                prompt,
                expects_plain_text: true,
                provider: request.provider,
            })
            .await;

        let content = into_content(response)?;
        let parsed = parse_question_array(content.trim())?;

        if parsed.skipped > 0 {
            tracing::warn!("Skipped {} unusable entries in refill", parsed.skipped);
        }

        let mut questions = parsed.questions;
        if questions.len() < self.pool_size {
            tracing::warn!(
                "Generated only {} questions instead of {}",
                questions.len(),
                self.pool_size
            );
        }
        questions.truncate(self.pool_size);

        let stored = questions.len();
        self.save(title, request.level, questions).await?;
        Ok(stored)
    }

    /// Pop a question, refilling once if the pool is empty
    pub async fn pop_or_refill(&self, request: RefillRequest<'_>) -> GameResult<String> {
        let title = &request.topic.title;

        if let Some(question) = self.try_pop(title, request.level).await? {
            tracing::debug!("Served question from pool '{}' at {}", title, request.level);
            return Ok(question);
        }

        self.refill(request).await?;

        self.try_pop(title, request.level)
            .await?
            .ok_or(GameError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayResponse, ScriptedGateway};
    use crate::store::MemoryStore;

    fn topic(title: &str) -> Topic {
        Topic {
            title: title.to_string(),
            description: "desc".to_string(),
        }
    }

    fn refill_request<'a>(topic: &'a Topic, used: &'a [String]) -> RefillRequest<'a> {
        RefillRequest {
            topic,
            level: IntensityLevel::Mild,
            player: "Al",
            recently_used: used,
            credential: "key",
            provider: Provider::Google,
        }
    }

    fn scripted(responses: Vec<GatewayResponse>) -> Arc<ScriptedGateway> {
        Arc::new(ScriptedGateway::new(responses))
    }

    fn make_pool(gateway: Arc<ScriptedGateway>, pool_size: usize) -> (QuestionPool, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (QuestionPool::new(store.clone(), gateway, pool_size), store)
    }

    #[test]
    fn test_normalization_collides_case_and_punctuation() {
        assert_eq!(normalize_title("Wild Stories!"), "wildstories");
        assert_eq!(
            pool_key("Wild Stories!", IntensityLevel::Mild),
            pool_key("wild stories", IntensityLevel::Mild)
        );
        assert_ne!(
            pool_key("Wild Stories", IntensityLevel::Mild),
            pool_key("Wild Stories", IntensityLevel::Spicy)
        );
        assert_eq!(normalize_title(&normalize_title("Hot-Takes 2!")), "hottakes2");

        // 'İ' lowercases to 'i' plus a combining dot
        let key = normalize_title("İstanbul Nights");
        assert!(key.chars().all(char::is_alphanumeric));
        assert_eq!(key, "istanbulnights");
        assert_eq!(normalize_title(&key), key);
        assert_eq!(
            pool_key("İstanbul Nights", IntensityLevel::Mild),
            pool_key("istanbul nights", IntensityLevel::Mild)
        );
    }

    #[tokio::test]
    async fn test_try_pop_absent_key_has_no_side_effects() {
        let gateway = scripted(vec![]);
        let (pool, store) = make_pool(gateway.clone(), 10);

        assert_eq!(pool.try_pop("Desires", IntensityLevel::Mild).await.unwrap(), None);
        assert!(store
            .get(&pool_key("Desires", IntensityLevel::Mild))
            .await
            .unwrap()
            .is_none());
        assert_eq!(gateway.calls().await, 0);
    }

    #[tokio::test]
    async fn test_seeded_pool_serves_fifo_without_gateway() {
        let gateway = scripted(vec![]);
        let (pool, store) = make_pool(gateway.clone(), 10);
        store
            .set(
                &pool_key("Desires", IntensityLevel::Mild),
                serde_json::json!(["Q1", "Q2"]),
            )
            .await
            .unwrap();

        let desires = topic("Desires");
        assert_eq!(pool.pop_or_refill(refill_request(&desires, &[])).await.unwrap(), "Q1");
        assert_eq!(pool.pop_or_refill(refill_request(&desires, &[])).await.unwrap(), "Q2");
        assert_eq!(gateway.calls().await, 0);
    }

    #[tokio::test]
    async fn test_refill_then_pop_returns_batch_in_order() {
        let batch: Vec<String> = (1..=10).map(|i| format!("Q{}?", i)).collect();
        let content = serde_json::to_string(&batch).unwrap();
        let gateway = scripted(vec![GatewayResponse::ok(content)]);
        let (pool, _) = make_pool(gateway, 10);

        let t = topic("Hot Takes");
        assert_eq!(pool.refill(refill_request(&t, &[])).await.unwrap(), 10);

        for expected in &batch {
            assert_eq!(
                pool.try_pop("Hot Takes", IntensityLevel::Mild).await.unwrap().as_ref(),
                Some(expected)
            );
        }
        assert_eq!(pool.try_pop("Hot Takes", IntensityLevel::Mild).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_short_refill_is_tolerated() {
        let gateway = scripted(vec![GatewayResponse::ok(r#"["A?","B?"]"#)]);
        let (pool, _) = make_pool(gateway.clone(), 10);
        let t = topic("Desires");

        assert_eq!(pool.pop_or_refill(refill_request(&t, &[])).await.unwrap(), "A?");
        assert_eq!(pool.try_pop("Desires", IntensityLevel::Mild).await.unwrap().as_deref(), Some("B?"));
        assert_eq!(pool.try_pop("Desires", IntensityLevel::Mild).await.unwrap(), None);
        assert_eq!(gateway.calls().await, 1);

        let request = gateway.requests().await[0].clone();
        assert!(request.expects_plain_text);
        assert!(request.prompt.contains("EXACTLY 10 questions"));
    }

    #[tokio::test]
    async fn test_oversized_refill_is_truncated() {
        let batch: Vec<String> = (1..=15).map(|i| format!("Q{}", i)).collect();
        let gateway = scripted(vec![GatewayResponse::ok(
            format!("```json\n{}\n```", serde_json::to_string(&batch).unwrap()),
        )]);
        let (pool, _) = make_pool(gateway, 10);
        let t = topic("Wild Stories");

        assert_eq!(pool.refill(refill_request(&t, &[])).await.unwrap(), 10);
        let stored = pool.peek("wild stories", IntensityLevel::Mild).await.unwrap();
        assert_eq!(stored, batch[..10].to_vec());
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_pool_unchanged() {
        let gateway = scripted(vec![GatewayResponse::failed("rate limited")]);
        let (pool, _) = make_pool(gateway, 10);
        let t = topic("Desires");

        let err = pool.pop_or_refill(refill_request(&t, &[])).await.unwrap_err();
        assert_eq!(err, GameError::GatewayFailure("rate limited".to_string()));
        assert!(pool.peek("Desires", IntensityLevel::Mild).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_refill_keeps_existing_pool() {
        let gateway = scripted(vec![GatewayResponse::ok(r#"{"questions": []}"#)]);
        let (pool, store) = make_pool(gateway, 10);
        store
            .set(&pool_key("Desires", IntensityLevel::Mild), serde_json::json!(["Keep"]))
            .await
            .unwrap();

        let t = topic("Desires");
        let err = pool.refill(refill_request(&t, &[])).await.unwrap_err();
        assert!(matches!(err, GameError::ResponseFormat { .. }));
        assert_eq!(pool.peek("Desires", IntensityLevel::Mild).await.unwrap(), vec!["Keep"]);
    }

    #[tokio::test]
    async fn test_empty_refill_is_exhausted() {
        let gateway = scripted(vec![GatewayResponse::ok("[]")]);
        let (pool, _) = make_pool(gateway, 10);
        let t = topic("Desires");

        let err = pool.pop_or_refill(refill_request(&t, &[])).await.unwrap_err();
        assert_eq!(err, GameError::Exhausted);
    }

    #[tokio::test]
    async fn test_refill_prompt_includes_recently_used() {
        let gateway = scripted(vec![GatewayResponse::ok(r#"["New?"]"#)]);
        let (pool, _) = make_pool(gateway.clone(), 10);
        let t = topic("Desires");
        let used = vec!["Old question?".to_string()];

        pool.pop_or_refill(refill_request(&t, &used)).await.unwrap();
        let request = gateway.requests().await[0].clone();
        assert!(request.prompt.contains("1. Old question?"));
    }

    #[tokio::test]
    async fn test_pools_are_shared_across_players() {
        let gateway = scripted(vec![GatewayResponse::ok(r#"["A?","B?"]"#)]);
        let (pool, _) = make_pool(gateway.clone(), 10);
        let t = topic("Desires");

        let first = pool.pop_or_refill(refill_request(&t, &[])).await.unwrap();
        let mut for_bo = refill_request(&t, &[]);
        for_bo.player = "Bo";
        let second = pool.pop_or_refill(for_bo).await.unwrap();

        assert_eq!((first.as_str(), second.as_str()), ("A?", "B?"));
        assert_eq!(gateway.calls().await, 1);
    }
}
