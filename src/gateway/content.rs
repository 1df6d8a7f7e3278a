//! Interpreting gateway content: code fence stripping and JSON extraction.

use super::GatewayResponse;
use crate::error::{GameError, GameResult};
use crate::types::Topic;
use serde_json::Value;

/// Questions extracted from a refill response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuestions {
    pub questions: Vec<String>,
    /// Array elements that were not non-empty strings
    pub skipped: usize,
}

/// Unwrap a gateway response into its content
pub fn into_content(response: GatewayResponse) -> GameResult<String> {
    if !response.success {
        let msg = response
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "API request failed".to_string());
        return Err(GameError::GatewayFailure(msg));
    }

    response
        .content
        .ok_or_else(|| format_error("response carried no content", ""))
}

/// Remove markdown code fences that models like to wrap JSON in
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse a JSON array of `{title, description}` topics
pub fn parse_topics(content: &str) -> GameResult<Vec<Topic>> {
    let items = parse_array(content)?;
    let total = items.len();

    let topics: Vec<Topic> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Topic>(item).ok())
        .filter(|topic| !topic.title.trim().is_empty())
        .collect();

    if topics.len() < total {
        tracing::warn!("Skipped {} malformed topics", total - topics.len());
    }
    if topics.is_empty() {
        return Err(format_error("no usable topics in response", content));
    }

    Ok(topics)
}

/// Parse a JSON array of question strings.
///
/// Non-string and blank elements are skipped rather than failing the batch.
pub fn parse_question_array(content: &str) -> GameResult<ParsedQuestions> {
    let items = parse_array(content)?;
    let total = items.len();

    let questions: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if has_text(&s) => Some(s.trim().to_string()),
            _ => None,
        })
        .collect();

    Ok(ParsedQuestions {
        skipped: total - questions.len(),
        questions,
    })
}

/// False for entries that are only quotes, question marks or whitespace
fn has_text(question: &str) -> bool {
    !question
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '?' || c.is_whitespace())
        .is_empty()
}

fn parse_array(content: &str) -> GameResult<Vec<Value>> {
    let cleaned = strip_code_fences(content);
    match serde_json::from_str::<Value>(&cleaned) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(_) => Err(format_error("expected a JSON array", content)),
        Err(e) => Err(format_error(&format!("not valid JSON ({})", e), content)),
    }
}

fn format_error(reason: &str, raw: &str) -> GameError {
    tracing::error!(raw = %raw, "Failed to parse gateway content: {}", reason);
    GameError::ResponseFormat {
        reason: reason.to_string(),
        raw: raw.to_string(),
    }
}
