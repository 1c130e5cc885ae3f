// src/normalize.rs
use serde::{Deserialize, Serialize};

use crate::sources::RawItem;

/// The minimal common shape the selection stage judges on: an identity
/// (url), a headline, and a one-element summary seed wrapping the cleaned
/// description. Derived deterministically from a RawItem; no side effects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedItem {
    pub title: Option<String>,
    pub summary: Option<Vec<String>>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

/// Normalize text: decode HTML entities, strip tags, collapse whitespace,
/// cap length.
pub fn clean_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // Length cap keeps prompt payloads bounded: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

pub fn normalize_item(raw: &RawItem) -> NormalizedItem {
    let summary = raw
        .description
        .as_deref()
        .map(clean_text)
        .filter(|s| !s.is_empty())
        .map(|s| vec![s]);

    NormalizedItem {
        title: raw.title.clone(),
        summary,
        url: raw.url.clone(),
        image: raw.image.clone(),
        source_name: raw.source.clone(),
        published_at: raw.published_at.clone(),
    }
}

/// One NormalizedItem per RawItem, always (length is preserved).
pub fn normalize_batch(raw: &[RawItem]) -> Vec<NormalizedItem> {
    raw.iter().map(normalize_item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, description: Option<&str>, url: &str) -> RawItem {
        RawItem {
            title: Some(title.to_string()),
            description: description.map(str::to_string),
            url: Some(url.to_string()),
            ..RawItem::default()
        }
    }

    #[test]
    fn clean_text_decodes_strips_and_collapses() {
        let s = "<b>Hello&nbsp;&nbsp;world</b>   again";
        assert_eq!(clean_text(s), "Hello world again");
    }

    #[test]
    fn output_length_equals_input_length() {
        let batch = vec![
            raw("a", Some("x"), "https://example.test/a"),
            raw("b", None, "https://example.test/b"),
            raw("c", Some(""), "https://example.test/c"),
        ];
        let out = normalize_batch(&batch);
        assert_eq!(out.len(), batch.len());
    }

    #[test]
    fn summary_is_none_iff_description_null_or_empty() {
        let with = normalize_item(&raw("t", Some("body text"), "u"));
        assert_eq!(with.summary, Some(vec!["body text".to_string()]));

        let none = normalize_item(&raw("t", None, "u"));
        assert!(none.summary.is_none());

        let empty = normalize_item(&raw("t", Some("   "), "u"));
        assert!(empty.summary.is_none());
    }

    #[test]
    fn summary_wraps_cleaned_description() {
        let item = normalize_item(&raw("t", Some("<p>A&amp;B  story</p>"), "u"));
        assert_eq!(item.summary, Some(vec!["A&B story".to_string()]));
    }
}
