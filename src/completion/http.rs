use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::http_errors::network_error;
use super::shapes::extract_text;
use super::{Completer, CompletionError, CompletionFuture, CompletionRequest, body_snippet};
use crate::config::{API_KEY_VAR, ApiKey, Config, ResponseShape};
use crate::model::{Message, Prompt};

#[derive(Debug, Serialize)]
struct TextCompletionBody<'a> {
    input: &'a str,
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

fn endpoint_url(template: &str, model: &str) -> String {
    template.replace("{model}", model)
}

/// Sends one POST per completion to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpCompleter {
    client: Client,
    url_template: String,
    api_key: Option<ApiKey>,
    response_shape: ResponseShape,
    timeout_secs: u64,
}

impl HttpCompleter {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to initialize HTTP client")?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            url_template: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            response_shape: cfg.response_shape,
            timeout_secs: cfg.timeout_secs,
        }
    }

    async fn post(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = request
            .api_key()
            .or(self.api_key.as_ref())
            .ok_or_else(|| {
                CompletionError::Config(format!(
                    "no API key available. Set {API_KEY_VAR} or add it to the secrets file."
                ))
            })?;
        let api_url = endpoint_url(&self.url_template, request.model());

        let builder = self.client.post(&api_url).bearer_auth(api_key.expose());
        let builder = match request.prompt() {
            Prompt::Text(input) => builder.json(&TextCompletionBody {
                input,
                max_output_tokens: request.max_tokens(),
                temperature: request.temperature(),
            }),
            Prompt::Messages(messages) => builder.json(&ChatCompletionBody {
                model: request.model(),
                messages,
                temperature: request.temperature(),
                max_tokens: request.max_tokens(),
            }),
        };
        debug!(
            api_url = %api_url,
            model = %request.model(),
            max_tokens = request.max_tokens(),
            "sending completion request"
        );

        let response = builder.send().await.map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %request.model(),
                error = %err,
                "completion request failed"
            );
            network_error(err, &api_url, self.timeout_secs)
        })?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|err| network_error(err, &api_url, self.timeout_secs))?;

        if !status.is_success() {
            warn!(
                api_url = %api_url,
                model = %request.model(),
                status = %status,
                response_body_len = response_body.len(),
                "completion endpoint returned non-success status"
            );
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body: body_snippet(&response_body),
            });
        }

        let unrecognized = || CompletionError::UnrecognizedResponseShape {
            expected: self.response_shape.as_str(),
            snippet: body_snippet(&response_body),
        };
        let parsed: Value = serde_json::from_str(&response_body).map_err(|err| {
            warn!(error = %err, "completion response is not JSON");
            unrecognized()
        })?;
        let text = extract_text(&parsed, self.response_shape).ok_or_else(|| {
            warn!(
                response_shape = self.response_shape.as_str(),
                response_body_len = response_body.len(),
                "completion response did not match the configured shape"
            );
            unrecognized()
        })?;

        debug!(
            model = %request.model(),
            response_len = text.len(),
            "received completion"
        );
        Ok(text)
    }
}

impl Completer for HttpCompleter {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.post(request))
    }
}
