use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque ID types for type safety
pub type SessionId = String;
pub type PlayerName = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub name: PlayerName,
}

/// Content-maturity tier of a round, ordered by escalation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Mild,
    Medium,
    Spicy,
    Intimate,
}

/// Prompt parameters attached to an intensity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntensityGuidance {
    pub description: &'static str,
    pub examples: &'static str,
    pub tone: &'static str,
}

impl IntensityLevel {
    pub const ALL: [IntensityLevel; 4] = [
        IntensityLevel::Mild,
        IntensityLevel::Medium,
        IntensityLevel::Spicy,
        IntensityLevel::Intimate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Medium => "medium",
            Self::Spicy => "spicy",
            Self::Intimate => "intimate",
        }
    }

    pub fn guidance(&self) -> IntensityGuidance {
        match self {
            Self::Mild => IntensityGuidance {
                description: "Light and playful - fun questions that keep things interesting but still comfortable",
                examples: "favorite experiences, fun preferences, light personal questions",
                tone: "Fun and engaging but still appropriate for acquaintances",
            },
            Self::Medium => IntensityGuidance {
                description: "More personal and revealing - questions that go deeper into experiences and opinions",
                examples: "dating experiences, personal beliefs, past relationships, moderate confessions",
                tone: "More intimate but still suitable for close friends",
            },
            Self::Spicy => IntensityGuidance {
                description: "Bold and revealing - questions about more intimate topics and experiences",
                examples: "attraction stories, romantic experiences, fantasies (PG-13), bold confessions",
                tone: "Flirty and provocative but tasteful - R-rated content",
            },
            Self::Intimate => IntensityGuidance {
                description: "Very personal and mature - deep questions about intimate experiences and desires",
                examples: "intimate experiences, desires, deep confessions, adult topics",
                tone: "Very mature and personal - for close friends only, full adult content",
            },
        }
    }
}

impl fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the group asked for: a fixed level or a fresh draw every round
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntensityPreference {
    #[default]
    Mild,
    Medium,
    Spicy,
    Intimate,
    Random,
}

impl IntensityPreference {
    /// The concrete level, or `None` for `Random`
    pub fn fixed_level(&self) -> Option<IntensityLevel> {
        match self {
            Self::Mild => Some(IntensityLevel::Mild),
            Self::Medium => Some(IntensityLevel::Medium),
            Self::Spicy => Some(IntensityLevel::Spicy),
            Self::Intimate => Some(IntensityLevel::Intimate),
            Self::Random => None,
        }
    }
}

impl From<IntensityLevel> for IntensityPreference {
    fn from(level: IntensityLevel) -> Self {
        match level {
            IntensityLevel::Mild => Self::Mild,
            IntensityLevel::Medium => Self::Medium,
            IntensityLevel::Spicy => Self::Spicy,
            IntensityLevel::Intimate => Self::Intimate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Text generation backend a request is routed to
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Google,
    Anthropic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    /// Preference order used when auto-selecting from preloaded credentials
    pub const ALL: [Provider; 3] = [Provider::Google, Provider::Anthropic, Provider::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Setup,
    Selecting,
    TopicChoice,
    QuestionReveal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Questions requested per pool refill
    pub pool_size: usize,
    /// Topics offered per round
    pub topic_count: usize,
    /// Names shown by the cosmetic spinner before a pick
    pub spin_ticks: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            pool_size: 10,
            topic_count: 3,
            spin_ticks: 21,
        }
    }
}
