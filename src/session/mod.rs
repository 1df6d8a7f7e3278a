mod roster;
mod round;

pub use round::format_question;

use crate::dedup::SessionLog;
use crate::error::GameError;
use crate::gateway::ContentGateway;
use crate::pool::QuestionPool;
use crate::store::KeyValueStore;
use crate::turn::Rotation;
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-round state, mutated only at round start
#[derive(Debug, Clone, Serialize)]
pub struct RoundState {
    pub current_player: Option<Player>,
    pub resolved_intensity: IntensityLevel,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            current_player: None,
            resolved_intensity: IntensityLevel::Mild,
        }
    }
}

/// Mutable session context owned by [`GameSession`]
struct SessionState {
    phase: GamePhase,
    roster: Vec<Player>,
    rotation: Rotation,
    round: RoundState,
    round_no: u32,
    preference: IntensityPreference,
    provider: Provider,
    credentials: HashMap<Provider, String>,
    topics: Vec<Topic>,
    question: Option<String>,
    spin: Vec<PlayerName>,
    /// Set while a gateway call for the current round is outstanding
    in_flight: bool,
    /// Bumped whenever the round is abandoned; results from older epochs are dropped
    epoch: u64,
    last_error: Option<String>,
    round_started_at: Option<DateTime<Utc>>,
    rng: StdRng,
}

impl SessionState {
    fn credential(&self) -> Option<&str> {
        self.credentials
            .get(&self.provider)
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }

    /// Remember a failure for the view and hand it back
    fn fail(&mut self, err: GameError) -> GameError {
        tracing::warn!("{} ({})", err, err.code());
        self.last_error = Some(err.user_message());
        err
    }

    fn require_phase(&mut self, expected: GamePhase, action: &'static str) -> Result<(), GameError> {
        if self.phase != expected {
            return Err(self.fail(GameError::InvalidTransition {
                action,
                phase: self.phase,
            }));
        }
        Ok(())
    }
}

/// Read-only snapshot of a session, safe to hand to clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub phase: GamePhase,
    pub round_no: u32,
    pub roster: Vec<Player>,
    pub used_players: Vec<PlayerName>,
    pub round: RoundState,
    pub preference: IntensityPreference,
    pub provider: Provider,
    pub has_credential: bool,
    pub topics: Vec<Topic>,
    pub question: Option<String>,
    pub spin: Vec<PlayerName>,
    pub in_flight: bool,
    pub last_error: Option<String>,
    pub round_started_at: Option<DateTime<Utc>>,
}

/// Round orchestrator: one game session driving the
/// `Setup -> Selecting -> TopicChoice -> QuestionReveal` state machine
#[derive(Clone)]
pub struct GameSession {
    id: SessionId,
    config: GameConfig,
    gateway: Arc<dyn ContentGateway>,
    pool: QuestionPool,
    log: SessionLog,
    state: Arc<RwLock<SessionState>>,
}

impl GameSession {
    /// Create a session. The pool store is long-lived and may be shared with
    /// other sessions; the log store only needs to live as long as this one.
    pub fn new(
        config: GameConfig,
        gateway: Arc<dyn ContentGateway>,
        pool_store: Arc<dyn KeyValueStore>,
        log_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self::with_rng(config, gateway, pool_store, log_store, StdRng::from_os_rng())
    }

    /// Like `new`, with a caller-supplied source for every random draw
    pub fn with_rng(
        config: GameConfig,
        gateway: Arc<dyn ContentGateway>,
        pool_store: Arc<dyn KeyValueStore>,
        log_store: Arc<dyn KeyValueStore>,
        rng: StdRng,
    ) -> Self {
        let pool = QuestionPool::new(pool_store, gateway.clone(), config.pool_size);
        let state = SessionState {
            phase: GamePhase::Setup,
            roster: Vec::new(),
            rotation: Rotation::new(),
            round: RoundState::default(),
            round_no: 0,
            preference: IntensityPreference::default(),
            provider: Provider::default(),
            credentials: HashMap::new(),
            topics: Vec::new(),
            question: None,
            spin: Vec::new(),
            in_flight: false,
            epoch: 0,
            last_error: None,
            round_started_at: None,
            rng,
        };

        Self {
            id: ulid::Ulid::new().to_string(),
            config,
            gateway,
            pool,
            log: SessionLog::new(log_store),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Load keys from the environment and select the first provider that has one
    pub async fn preload_credentials(&self, credentials: &HashMap<Provider, String>) {
        let mut state = self.state.write().await;
        for (provider, key) in credentials {
            if !key.trim().is_empty() {
                state.credentials.insert(*provider, key.trim().to_string());
            }
        }

        if let Some(provider) = Provider::ALL
            .into_iter()
            .find(|p| state.credentials.contains_key(p))
        {
            tracing::info!("Auto-selected provider {} from preloaded keys", provider);
            state.provider = provider;
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gateway(&self) -> Arc<dyn ContentGateway> {
        self.gateway.clone()
    }

    pub fn pool(&self) -> &QuestionPool {
        &self.pool
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Snapshot of the current state
    pub async fn view(&self) -> SessionView {
        let state = self.state.read().await;

        let mut used_players: Vec<PlayerName> = state.rotation.used().iter().cloned().collect();
        used_players.sort();

        SessionView {
            id: self.id.clone(),
            phase: state.phase,
            round_no: state.round_no,
            roster: state.roster.clone(),
            used_players,
            round: state.round.clone(),
            preference: state.preference,
            provider: state.provider,
            has_credential: state.credential().is_some(),
            topics: state.topics.clone(),
            question: state.question.clone(),
            spin: state.spin.clone(),
            in_flight: state.in_flight,
            last_error: state.last_error.clone(),
            round_started_at: state.round_started_at,
        }
    }

    /// Switch provider. Keys are held per provider, so the session's key
    /// becomes whatever was preloaded or typed for `provider`, and switching
    /// to a provider without one leaves the session without a credential.
    pub async fn set_provider(&self, provider: Provider) {
        let mut state = self.state.write().await;
        if state.provider != provider {
            tracing::info!("Provider changed from {} to {}", state.provider, provider);
        }
        state.provider = provider;
    }

    /// Set the key for the current provider; a blank key clears it
    pub async fn set_credential(&self, credential: &str) {
        let mut state = self.state.write().await;
        let provider = state.provider;
        let credential = credential.trim();
        if credential.is_empty() {
            state.credentials.remove(&provider);
        } else {
            state.credentials.insert(provider, credential.to_string());
        }
    }

    /// Takes effect at the next round start
    pub async fn set_preference(&self, preference: IntensityPreference) {
        self.state.write().await.preference = preference;
    }
}
