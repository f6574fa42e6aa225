pub mod completion;
pub mod config;
pub mod logging;
pub mod model;
pub mod prompt;
pub mod repl;
pub mod response;
pub mod session;
pub mod web;

use anyhow::{Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use tracing::info;

use completion::completer_from_config;
use config::{API_KEY_VAR, Config};
use prompt::PromptBuilder;
use repl::run_repl;
use session::ChatSession;

#[derive(Debug, Parser)]
#[command(name = "gordon", version, about = "Chat with a brutally honest kitchen judge")]
pub struct Cli {
    /// Message for a single turn. Starts the interactive loop when omitted.
    pub prompt: Vec<String>,

    /// Return a canned reply instead of calling the API (same as GROQ_MOCK=true).
    #[arg(long)]
    pub mock: bool,

    /// Print the prompt that would be sent and exit.
    #[arg(long)]
    pub print_prompt: bool,

    /// Serve the browser front-end instead of the terminal loop.
    #[arg(long)]
    pub serve: bool,

    /// Listen address for --serve.
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub addr: SocketAddr,
}

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    if cli.mock {
        cfg.mock = true;
    }
    info!(
        model = %cfg.model,
        endpoint = %cfg.endpoint_url(),
        mock = cfg.mock,
        wire_format = cfg.wire_format.as_str(),
        response_shape = cfg.response_shape.as_str(),
        api_key_origin = cfg.api_key_origin.map(|origin| origin.as_str()).unwrap_or("none"),
        "loaded runtime configuration"
    );

    if cli.print_prompt {
        let prompt = PromptBuilder::new(&cfg).build(&cli.prompt.join(" "), &[]);
        println!("{}", prompt.render());
        return Ok(());
    }

    let completer = completer_from_config(&cfg)?;
    if cli.serve {
        return web::serve(cfg, completer, cli.addr).await;
    }

    if !cfg.mock && !cfg.has_api_key() {
        bail!(
            "configuration error: {API_KEY_VAR} is not set. Set it in the environment or .env, \
             add it to the secrets file, or run with GROQ_MOCK=true."
        );
    }

    if cli.prompt.is_empty() {
        run_repl(&cfg, completer).await
    } else {
        let mut session = ChatSession::new(&cfg, completer);
        let parsed = session.run_turn(&cli.prompt.join(" ")).await?;
        println!("{}", parsed.render());
        Ok(())
    }
}
