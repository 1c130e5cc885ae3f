// src/ai/mod.rs
pub mod openai;
pub mod prompts;

use std::sync::Arc;

/// Single-turn completion capability. The stages hand it a prompt and
/// expect free text back; everything JSON-shaped about the reply is the
/// caller's problem, with a deterministic fallback on every parse path.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletion = Arc<dyn CompletionClient>;

/// Deterministic scripted client for tests and local runs: the responder
/// computes a reply from the prompt, so fan-out ordering cannot skew which
/// item gets which reply.
pub struct MockCompletion {
    responder: Box<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>,
}

impl MockCompletion {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }

    /// A client that fails every call, for exercising fallback paths.
    pub fn failing() -> Self {
        Self::new(|_| Err(anyhow::anyhow!("completion unavailable")))
    }

    /// A client that returns the same payload for every call.
    pub fn fixed(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }
}

#[async_trait::async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        (self.responder)(prompt)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
