// src/select.rs
//! # Selection Stage
//! Reduces a normalized batch to a curated subset via one completion call.
//! The reply is modeled as a tagged variant with an explicit parser per
//! expected shape (never field-presence duck-typing) and an explicit
//! per-stream fallback policy. Nothing in here propagates an error upward.

use metrics::counter;
use std::collections::HashSet;

use crate::ai::DynCompletion;
use crate::normalize::NormalizedItem;

/// What to do when the completion reply cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionFallback {
    /// Keep the first `n` submitted items, in original order.
    Prefix(usize),
    /// Keep nothing. Better to show no "uplifting" news than wrong news.
    Empty,
}

/// The two reply shapes the prompts contract for.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionReply {
    /// Chosen item objects, echoed back by the model.
    Items(Vec<NormalizedItem>),
    /// 0-based positions into the submitted batch.
    Indices(Vec<usize>),
}

/// Per-stream selection behavior: prompt builder, reply field names,
/// count bounds (configuration, not constants), and the fallback policy.
#[derive(Clone)]
pub struct SelectionPolicy {
    pub prompt: fn(&[NormalizedItem], u32, u32) -> String,
    pub items_field: &'static str,
    pub indices_field: &'static str,
    pub select_min: u32,
    pub select_max: u32,
    pub fallback: SelectionFallback,
}

/// Parse the raw completion text into one of the contracted shapes.
/// Returns `None` for anything unusable (non-JSON, missing field,
/// non-array value, wrong element types).
pub fn parse_reply(raw: &str, policy: &SelectionPolicy) -> Option<SelectionReply> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;

    match value {
        serde_json::Value::Object(map) => {
            if let Some(v) = map.get(policy.indices_field) {
                let arr = v.as_array()?;
                let indices = arr
                    .iter()
                    .map(|n| n.as_u64().map(|n| n as usize))
                    .collect::<Option<Vec<_>>>()?;
                return Some(SelectionReply::Indices(indices));
            }
            if let Some(v) = map.get(policy.items_field) {
                let items = serde_json::from_value(v.clone()).ok()?;
                return Some(SelectionReply::Items(items));
            }
            None
        }
        // A bare top-level array of item objects is accepted too; models
        // drop the wrapper often enough that rejecting it costs real runs.
        serde_json::Value::Array(_) => {
            let items = serde_json::from_value(value).ok()?;
            Some(SelectionReply::Items(items))
        }
        _ => None,
    }
}

/// Map a parsed reply back onto the submitted items.
///
/// Index replies keep submitted order and ignore out-of-range positions.
/// Item replies keep the model's order but are resolved against the input
/// by url identity, so the output is always a subset of the input set and
/// duplicates collapse.
pub fn apply_reply(reply: SelectionReply, inputs: &[NormalizedItem]) -> Vec<NormalizedItem> {
    match reply {
        SelectionReply::Indices(indices) => {
            let wanted: HashSet<usize> = indices.into_iter().collect();
            inputs
                .iter()
                .enumerate()
                .filter(|(i, _)| wanted.contains(i))
                .map(|(_, item)| item.clone())
                .collect()
        }
        SelectionReply::Items(items) => {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut out = Vec::new();
            for chosen in &items {
                let Some(url) = chosen.url.as_deref() else {
                    continue;
                };
                if !seen.insert(url) {
                    continue;
                }
                if let Some(original) = inputs.iter().find(|i| i.url.as_deref() == Some(url)) {
                    out.push(original.clone());
                }
            }
            out
        }
    }
}

fn fall_back(policy: &SelectionPolicy, inputs: &[NormalizedItem]) -> Vec<NormalizedItem> {
    counter!("selection_fallback_total").increment(1);
    match policy.fallback {
        SelectionFallback::Prefix(n) => inputs[..n.min(inputs.len())].to_vec(),
        SelectionFallback::Empty => Vec::new(),
    }
}

/// Run the stage. Capability or parse failures degrade to the policy's
/// deterministic fallback; they never throw past this function.
pub async fn select(
    client: &DynCompletion,
    policy: &SelectionPolicy,
    inputs: &[NormalizedItem],
) -> Vec<NormalizedItem> {
    if inputs.is_empty() {
        return Vec::new();
    }

    let prompt = (policy.prompt)(inputs, policy.select_min, policy.select_max);
    let raw = match client.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "selection completion failed, using fallback");
            return fall_back(policy, inputs);
        }
    };

    match parse_reply(&raw, policy) {
        Some(reply) => {
            let kept = apply_reply(reply, inputs);
            tracing::info!(submitted = inputs.len(), kept = kept.len(), "selection done");
            kept
        }
        None => {
            tracing::warn!("selection reply unparseable, using fallback");
            fall_back(policy, inputs)
        }
    }
}
