// src/ai/prompts.rs
// Prompt contracts for the two streams. Each builder pins the exact JSON
// shape the parser on the other side expects; the stages own the fallback
// when the model strays from it.

use crate::normalize::NormalizedItem;

fn items_json(items: &[NormalizedItem]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
}

/// Selection prompt for the general stream. Returns chosen item objects
/// under `topStories`. Bounds come from configuration, not constants.
pub fn select_general(items: &[NormalizedItem], min: u32, max: u32) -> String {
    format!(
        r#"You are an AI news assistant. Your task is to select the most important news stories from this list.

Here are recent news articles:
{articles}

Rules:
- Choose between {min} and {max} articles in total, ensuring a mix of global, Australian, and state-level news.
- Prioritize importance, impact, and relevance to an Australian reader.
- Allowed topics: politics, economy, health, science, technology, environment, significant world events.
- Excluded topics: sport, entertainment, celebrity, lifestyle, fashion, travel, food, local trivia.
- Ensure topic diversity (not all politics, not all disasters).
- Avoid duplicate or near-identical stories.
- For every article you keep, verify each of these before including it: (1) it is not about an excluded topic, (2) it is not a duplicate of another kept story, (3) it is genuinely newsworthy beyond a single suburb or club.

Return ONLY JSON in this format:
{{
  "topStories": [...the selected article objects, copied verbatim...]
}}"#,
        articles = items_json(items),
        min = min,
        max = max,
    )
}

/// Selection prompt for the uplifting stream. Returns 0-based positions
/// into the submitted list under `selectedIndices`, which keeps the reply
/// small and sidesteps the model mangling item objects.
pub fn select_uplifting(items: &[NormalizedItem], _min: u32, max: u32) -> String {
    format!(
        r#"You are an AI news assistant curating genuinely uplifting news.

Here are candidate stories, in order:
{articles}

Rules:
- Select up to {max} stories that are genuinely positive and uplifting: recoveries, rescues, scientific breakthroughs, acts of kindness, community wins.
- Reject anything negative, tragic, political point-scoring, or only superficially positive.
- Reject duplicates or near-identical stories.
- For every story you keep, verify each of these before including it: (1) a reasonable reader would feel better for having read it, (2) it is not a repackaged tragedy, (3) it is not a duplicate.

Return ONLY JSON in this format:
{{
  "selectedIndices": [0-based positions of the selected stories]
}}"#,
        articles = items_json(items),
        max = max,
    )
}

/// Rewrite prompt for one general-stream item: keep or improve the
/// headline, produce 3-5 contextual bullets. Carries a mandatory rejection
/// pre-check as a second line of defense after selection.
pub fn rewrite_general(item: &NormalizedItem) -> String {
    let article = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"You are an AI news editor. Your job is to summarize news articles in a clear, concise way.

Here is the news article:
{article}

Before anything else, judge whether this article belongs in a serious general-news digest. If it is about sport, entertainment, celebrity, lifestyle, fashion, travel, or food, return exactly this rejection object and nothing more:
{{
  "title": "",
  "summary": []
}}

Otherwise:
1. Create a more informative title if needed (or keep the original if it's already good).
2. Generate 3-5 bullet points that summarize the key information from this article.
   - Spell out full names, titles, and locations on first mention.
   - For international stories, add one bullet noting the relevance to Australia.
   - Do not include URLs.

Return ONLY a JSON object in this format:
{{
  "title": "The informative title",
  "summary": ["Bullet point 1", "Bullet point 2", "Bullet point 3"]
}}"#,
        article = article,
    )
}

/// Rewrite prompt for one uplifting-stream headline. Only the title is
/// rewritten; the caller wraps it as the single summary line.
pub fn rewrite_uplifting(title: &str) -> String {
    format!(
        r#"You are an AI news editor for an uplifting-news digest.

Here is a headline:
{title:?}

Rewrite it to maximize warm, positive framing while staying factually accurate. Keep it under 120 characters. Do not invent details.

Return ONLY a JSON object in this format:
{{
  "title": "The rewritten headline"
}}"#,
    )
}
