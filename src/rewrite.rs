// src/rewrite.rs
//! # Rewrite Stage
//! One completion call per selected item, fanned out concurrently and
//! joined; output order follows input order because each call is mapped,
//! not raced into a shared accumulator. A failure on any single item is
//! absorbed locally: the stage yields one outcome per input, and only a
//! deliberate model rejection (never a failure) can drop an item later.

use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::ai::{prompts, DynCompletion};
use crate::normalize::NormalizedItem;

/// The externally served shape. `summary` is always a non-empty list:
/// every failure path substitutes a sentinel string instead of leaving it
/// empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedItem {
    pub title: Option<String>,
    pub summary: Vec<String>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

/// Outcome per input item. `Rejected` only ever comes from the model's
/// explicit topic-fitness sentinel in the general rewrite prompt;
/// transport/parse failures always produce a `Kept` fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum RewriteOutcome {
    Kept(ProcessedItem),
    Rejected,
}

/// Which rewrite contract a stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStyle {
    /// Title plus 3-5 contextual bullets, with the rejection pre-check.
    FullSummary,
    /// Headline only; the summary becomes that single rewritten headline.
    HeadlineOnly,
}

#[derive(Deserialize)]
struct RewriteReply {
    title: Option<String>,
    #[serde(default)]
    summary: Option<Vec<String>>,
}

fn base_output(item: &NormalizedItem) -> ProcessedItem {
    ProcessedItem {
        title: item.title.clone(),
        summary: Vec::new(),
        url: item.url.clone(),
        image: item.image.clone(),
        source_name: item.source_name.clone(),
        published_at: item.published_at.clone(),
    }
}

/// Fallback summary for the general stream: the original description seed
/// when there is one, a sentinel line otherwise.
fn general_fallback_summary(item: &NormalizedItem, failed: bool) -> Vec<String> {
    match &item.summary {
        Some(seed) if !seed.is_empty() => seed.clone(),
        _ if failed => vec!["Summary not available due to error".to_string()],
        _ => vec!["No summary available".to_string()],
    }
}

async fn rewrite_general_one(client: &DynCompletion, item: &NormalizedItem) -> RewriteOutcome {
    // Items with no headline carry nothing the model can work from.
    if item.title.is_none() {
        let mut out = base_output(item);
        out.summary = vec!["Skipped due to missing data".to_string()];
        return RewriteOutcome::Kept(out);
    }

    let prompt = prompts::rewrite_general(item);
    let raw = match client.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, title = ?item.title, "rewrite failed, keeping original");
            counter!("rewrite_fallback_total").increment(1);
            let mut out = base_output(item);
            out.summary = general_fallback_summary(item, true);
            return RewriteOutcome::Kept(out);
        }
    };

    match serde_json::from_str::<RewriteReply>(raw.trim()) {
        Ok(reply) => {
            // Both fields present and empty is the rejection sentinel;
            // absent fields are just a malformed reply and fall back.
            let explicit_reject = reply.title.as_deref().is_some_and(|t| t.trim().is_empty())
                && reply.summary.as_deref().is_some_and(|s| s.is_empty());
            if explicit_reject {
                // The model's explicit rejection sentinel: second line of
                // defense after selection, dropped by the orchestrator.
                counter!("rewrite_rejected_total").increment(1);
                return RewriteOutcome::Rejected;
            }

            let mut out = base_output(item);
            out.title = reply
                .title
                .filter(|t| !t.trim().is_empty())
                .or_else(|| item.title.clone());
            out.summary = match reply.summary {
                Some(bullets) if !bullets.is_empty() => bullets,
                _ => general_fallback_summary(item, false),
            };
            RewriteOutcome::Kept(out)
        }
        Err(e) => {
            tracing::warn!(error = %e, title = ?item.title, "rewrite reply unparseable");
            counter!("rewrite_fallback_total").increment(1);
            let mut out = base_output(item);
            out.summary = general_fallback_summary(item, true);
            RewriteOutcome::Kept(out)
        }
    }
}

async fn rewrite_uplifting_one(client: &DynCompletion, item: &NormalizedItem) -> RewriteOutcome {
    let original = item.title.clone().unwrap_or_default();
    let prompt = prompts::rewrite_uplifting(&original);

    let rewritten = match client.complete(&prompt).await {
        Ok(raw) => serde_json::from_str::<RewriteReply>(raw.trim())
            .ok()
            .and_then(|r| r.title)
            .filter(|t| !t.trim().is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, title = %original, "headline rewrite failed");
            None
        }
    };
    if rewritten.is_none() {
        counter!("rewrite_fallback_total").increment(1);
    }

    let title = rewritten.unwrap_or(original);
    let mut out = base_output(item);
    out.summary = vec![title.clone()];
    out.title = Some(title);
    RewriteOutcome::Kept(out)
}

/// Rewrite a whole selected batch. Exactly one outcome per input, in input
/// order, regardless of how many individual calls fail.
pub async fn rewrite_batch(
    client: &DynCompletion,
    style: RewriteStyle,
    items: &[NormalizedItem],
) -> Vec<RewriteOutcome> {
    let futures = items.iter().map(|item| async move {
        match style {
            RewriteStyle::FullSummary => rewrite_general_one(client, item).await,
            RewriteStyle::HeadlineOnly => rewrite_uplifting_one(client, item).await,
        }
    });
    join_all(futures).await
}
