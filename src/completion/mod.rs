mod http;
mod http_errors;
mod mock;
mod shapes;

use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{ApiKey, Config};
use crate::model::Prompt;

pub use http::HttpCompleter;
pub use mock::{MOCK_RESPONSE, MockCompleter};
pub use shapes::extract_text;

const BODY_SNIPPET_CHARS: usize = 512;

/// Failures surfaced by a completion call. Nothing here is retried.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("unrecognized response shape (expected {expected}): {snippet}")]
    UnrecognizedResponseShape {
        expected: &'static str,
        snippet: String,
    },
}

/// One completion call's inputs, fixed at construction.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    prompt: Prompt,
    model: String,
    max_tokens: u32,
    temperature: f32,
    api_key: Option<ApiKey>,
}

impl CompletionRequest {
    pub fn new(prompt: Prompt, cfg: &Config) -> Self {
        Self {
            prompt,
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            temperature: cfg.temperature,
            api_key: None,
        }
    }

    /// Use `key` instead of the client's configured key for this call only.
    pub fn with_api_key(self, key: ApiKey) -> Self {
        Self {
            api_key: Some(key),
            ..self
        }
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }
}

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = std::result::Result<String, CompletionError>> + Send + 'a>>;

pub trait Completer: Send + Sync {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

/// Picks the mock or the HTTP client according to `cfg.mock`.
pub fn completer_from_config(cfg: &Config) -> Result<Arc<dyn Completer>> {
    if cfg.mock {
        debug!("mock mode enabled, completions will not touch the network");
        return Ok(Arc::new(MockCompleter));
    }

    Ok(Arc::new(HttpCompleter::new(cfg)?))
}

pub(crate) fn body_snippet(body: &str) -> String {
    let mut chars = body.chars();
    let snippet: String = chars.by_ref().take(BODY_SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{snippet}...")
    } else {
        snippet
    }
}
