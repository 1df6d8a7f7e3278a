//! Prompt text sent to the content gateway.

use crate::types::{IntensityLevel, Topic};

/// Prompt asking for `count` topics as a JSON array of `{title, description}`
pub fn topics_prompt(player: &str, level: IntensityLevel, count: usize) -> String {
    let guidance = level.guidance();
    let upper = level.as_str().to_uppercase();

    let format_lines = (0..count)
        .map(|_| r#"  {"title": "Topic Title", "description": "Brief description"}"#)
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"You are generating {count} conversation topics for an ADULT-ONLY friends game (18+).

Player: {player}
Spice Level: {upper} - {description}

ALL CONTENT MUST BE FOR ADULTS ONLY (18+). This is NOT family-friendly.

SPICE LEVEL GUIDELINES:
{tone}

Examples of appropriate content: {examples}

Pick {count} fun and engaging topics from DIFFERENT categories:

CATEGORIES TO CHOOSE FROM:
1. ROMANTIC EXPERIENCES: Dating stories, relationships, attraction, romantic moments
2. PERSONAL CONFESSIONS: Secrets, embarrassing moments, things you've never told anyone
3. DESIRES & FANTASIES: Dreams, wishes, what you want in life/love, hypotheticals
4. WILD STORIES: Party stories, adventures, rebellious moments, crazy experiences
5. OPINIONS & BELIEFS: Hot takes, controversial opinions, personal philosophies
6. INTIMATE QUESTIONS: Personal preferences, intimate experiences (adjust intensity to spice level)
7. SELF-REFLECTION: Deep thoughts, personal growth, things you've learned
8. SOCIAL DYNAMICS: Friendship drama, social experiences, relationship dynamics

Requirements:
- VARY the categories - don't repeat!
- Make titles CATCHY and INTRIGUING (2-4 words max)
- Keep descriptions SUPER SHORT and CLEAR
- Adjust content intensity to match the {level} spice level
- At {level} level: {tone}

Return ONLY this JSON format:
[
{format_lines}
]"#,
        description = guidance.description,
        tone = guidance.tone,
        examples = guidance.examples,
    )
}

/// Prompt asking for a batch of `pool_size` questions as a JSON array.
///
/// `used` questions are listed as examples to avoid; the list is advisory.
pub fn question_pool_prompt(
    topic: &Topic,
    player: &str,
    level: IntensityLevel,
    pool_size: usize,
    used: &[String],
) -> String {
    let guidance = level.guidance();
    let upper = level.as_str().to_uppercase();

    let used_section = if used.is_empty() {
        String::new()
    } else {
        let numbered = used
            .iter()
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "\n\nPREVIOUSLY USED QUESTIONS (DO NOT REPEAT THESE):\n{}",
            numbered
        )
    };

    format!(
        r#"Generate EXACTLY {pool_size} questions for an ADULT-ONLY friends game (18+).

Topic: "{title}" - {topic_description}
Player: {player}
Spice Level: {upper} - {description}

ALL CONTENT MUST BE FOR ADULTS ONLY (18+). This is NOT family-friendly.

SPICE LEVEL GUIDELINES:
{tone}

Rules:
- Use CONVERSATIONAL, NATURAL language
- Make them SHORT and CLEAR
- Make them ENGAGING and thought-provoking
- Ask about SPECIFIC situations or experiences
- Adjust ALL content intensity to match the {level} spice level
- Should create interesting adult conversation
- Be bold and direct - this is for adults
- Each question must be DIFFERENT from each other{used_section}

Examples of {level} level questions:
{examples}

Return ONLY a JSON array of {pool_size} questions. Format: ["question 1?", "question 2?", ...]
No markdown, no extra text, just the JSON array."#,
        title = topic.title,
        topic_description = topic.description,
        description = guidance.description,
        tone = guidance.tone,
        examples = guidance.examples,
    )
}
