use crate::store::StoreError;
use crate::types::{GamePhase, Provider};

pub type GameResult<T> = Result<T, GameError>;

/// Failures surfaced by the round orchestrator
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("No API key configured for provider {0}")]
    MissingCredential(Provider),

    #[error("At least 2 players are required, have {0}")]
    InsufficientRoster(usize),

    #[error("Gateway request failed: {0}")]
    GatewayFailure(String),

    #[error("Invalid response format from gateway: {reason}")]
    ResponseFormat { reason: String, raw: String },

    #[error("Question pool refill produced no usable questions")]
    Exhausted,

    #[error("Player name must not be empty")]
    InvalidPlayerName,

    #[error("No player at position {0}")]
    PlayerNotFound(usize),

    #[error("Roster can only be edited before the game starts")]
    RosterLocked,

    #[error("Cannot {action} during {phase:?}")]
    InvalidTransition {
        action: &'static str,
        phase: GamePhase,
    },

    #[error("A request for this round is already in progress")]
    RequestInFlight,

    #[error("The round ended before the request finished")]
    RoundEnded,

    #[error("No topic offered at position {0}")]
    TopicNotOffered(usize),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for GameError {
    fn from(e: StoreError) -> Self {
        GameError::Storage(e.to_string())
    }
}

impl GameError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "MISSING_CREDENTIAL",
            Self::InsufficientRoster(_) => "INSUFFICIENT_ROSTER",
            Self::GatewayFailure(_) => "GATEWAY_FAILURE",
            Self::ResponseFormat { .. } => "RESPONSE_FORMAT",
            Self::Exhausted => "EXHAUSTED",
            Self::InvalidPlayerName => "INVALID_PLAYER_NAME",
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::RosterLocked => "ROSTER_LOCKED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::RequestInFlight => "REQUEST_IN_FLIGHT",
            Self::RoundEnded => "ROUND_ENDED",
            Self::TopicNotOffered(_) => "TOPIC_NOT_OFFERED",
            Self::Storage(_) => "STORAGE",
        }
    }

    /// Message suitable for showing to the players
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential(provider) => {
                format!("Please enter an API key for {} to start.", provider)
            }
            Self::InsufficientRoster(_) => "Add at least 2 players to start the game.".to_string(),
            Self::GatewayFailure(msg) => format!(
                "Error generating content: {}. Please check your API key and try again.",
                msg
            ),
            Self::ResponseFormat { .. } => {
                "The AI returned an unexpected response. Please try again.".to_string()
            }
            Self::Exhausted => {
                "No fresh questions could be generated for this topic. Please try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }

    /// Whether retrying the same action may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GatewayFailure(_)
                | Self::ResponseFormat { .. }
                | Self::Exhausted
                | Self::RequestInFlight
                | Self::Storage(_)
        )
    }
}
