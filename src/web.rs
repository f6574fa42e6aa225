use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::completion::{Completer, CompletionError, CompletionRequest};
use crate::config::{API_KEY_VAR, Config};
use crate::prompt::PromptBuilder;
use crate::response::{self, ParsedResponse};

const PAGE_TITLE: &str = "Gordon Bot";

pub struct WebState {
    cfg: Config,
    completer: Arc<dyn Completer>,
    builder: PromptBuilder,
}

impl WebState {
    pub fn new(cfg: Config, completer: Arc<dyn Completer>) -> Self {
        let builder = PromptBuilder::new(&cfg);
        Self {
            cfg,
            completer,
            builder,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Banner {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

impl Banner {
    fn class(&self) -> &'static str {
        match self {
            Self::Info(_) => "info",
            Self::Success(_) => "success",
            Self::Warning(_) => "warning",
            Self::Error(_) => "error",
        }
    }

    fn text(&self) -> &str {
        match self {
            Self::Info(text) | Self::Success(text) | Self::Warning(text) | Self::Error(text) => {
                text
            }
        }
    }
}

fn status_banner(cfg: &Config) -> Banner {
    if cfg.mock {
        return Banner::Info(
            "Mock mode: no external API is called, replies are simulated.".to_string(),
        );
    }

    match cfg.api_key_origin {
        Some(origin) => Banner::Success(format!("API key loaded from the {}.", origin.as_str())),
        None => Banner::Warning(format!(
            "No API key found. Set {API_KEY_VAR} in the environment or the secrets file, or enable GROQ_MOCK."
        )),
    }
}

pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(index).post(ask))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn serve(cfg: Config, completer: Arc<dyn Completer>, addr: SocketAddr) -> Result<()> {
    if let Banner::Warning(message) = status_banner(&cfg) {
        warn!("{message}");
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind web front-end to {addr}"))?;
    let local_addr = listener.local_addr().context("Failed to read bound address")?;
    info!(addr = %local_addr, "web front-end listening");
    println!("open http://{local_addr}/ in a browser (ctrl-c to stop)");

    let app = router(Arc::new(WebState::new(cfg, completer)));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Web front-end failed")
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<WebState>>) -> Html<String> {
    Html(render_page(&state.cfg, "", None))
}

async fn ask(State(state): State<Arc<WebState>>, Form(form): Form<AskForm>) -> Html<String> {
    let message = form.message.trim();
    if message.is_empty() {
        return Html(render_page(&state.cfg, "", None));
    }

    let request = CompletionRequest::new(state.builder.build(message, &[]), &state.cfg);
    let outcome = state
        .completer
        .complete(&request)
        .await
        .map(|raw| response::parse(&raw));
    if let Err(err) = &outcome {
        warn!(error = %err, "web completion failed");
    }

    Html(render_page(&state.cfg, message, Some(&outcome)))
}

fn render_page(
    cfg: &Config,
    message: &str,
    outcome: Option<&Result<ParsedResponse, CompletionError>>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{PAGE_TITLE}</h1>");
    let _ = writeln!(
        body,
        "<p>Ask Gordon anything. Expect harsh criticism, sometimes profane.</p>"
    );
    push_banner(&mut body, &status_banner(cfg));
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/\">\n<textarea name=\"message\" rows=\"5\" cols=\"60\">{}</textarea>\n<button type=\"submit\">Send</button>\n</form>",
        escape_html(message)
    );

    match outcome {
        None => {}
        Some(Err(err)) => push_banner(&mut body, &Banner::Error(format!("API call failed: {err}"))),
        Some(Ok(parsed)) => push_response(&mut body, parsed),
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{PAGE_TITLE}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn push_banner(body: &mut String, banner: &Banner) {
    let _ = writeln!(
        body,
        "<div class=\"banner {}\">{}</div>",
        banner.class(),
        escape_html(banner.text())
    );
}

fn push_response(body: &mut String, parsed: &ParsedResponse) {
    if parsed.raw.trim().is_empty() {
        push_banner(body, &Banner::Info("(no response)".to_string()));
        return;
    }

    let _ = writeln!(
        body,
        "<h2>Raw response</h2>\n<pre><code>{}</code></pre>",
        escape_html(&parsed.raw)
    );

    match (&parsed.thoughts, &parsed.gordon) {
        (Some(thoughts), Some(gordon)) => {
            let _ = writeln!(
                body,
                "<h2>THOUGHTS</h2>\n<p class=\"thoughts\">{}</p>\n<h2>GORDON</h2>\n<p class=\"gordon\">{}</p>",
                escape_html(thoughts),
                escape_html(gordon)
            );
        }
        _ => push_banner(
            body,
            &Banner::Info(
                "The reply has no explicit THOUGHTS/GORDON markers. See the raw response."
                    .to_string(),
            ),
        ),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
