use std::sync::Arc;

use clap::{Parser, ValueEnum};
use sui_assistant::llm::LlmClient;
use sui_assistant::llm::config::LlmConfig;
use sui_assistant::llm::types::LlmError;
use sui_assistant::repl;
use sui_assistant::services::completion::CompletionClient;
use sui_assistant::services::conversation::{
    ConversationOptions, ConversationStore, DEFAULT_MAX_PROMPT_CHARS, SubmitPolicy,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("LLM setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Overlap,
    RejectWhileBusy,
}

impl From<PolicyArg> for SubmitPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Overlap => Self::Overlap,
            PolicyArg::RejectWhileBusy => Self::RejectWhileBusy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sui-assistant", about = "Ask the Sui Indonesia developer assistant from the terminal")]
struct Cli {
    /// Longest accepted prompt in characters (0 = unlimited).
    #[arg(long, env = "ASSISTANT_MAX_PROMPT_CHARS", default_value_t = DEFAULT_MAX_PROMPT_CHARS)]
    max_prompt_chars: usize,

    /// What to do with a prompt sent while another is pending.
    #[arg(long, env = "ASSISTANT_SUBMIT_POLICY", value_enum, default_value = "overlap")]
    policy: PolicyArg,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = LlmConfig::from_env()?;
    let api_key_configured = config.has_api_key();
    if !api_key_configured {
        tracing::warn!(var = %config.api_key_env, "API key not set, requests will fail with the fallback reply");
    }

    let llm = LlmClient::from_config(config)?;
    tracing::info!(model = llm.model(), "LLM client initialized");

    let completer = Arc::new(CompletionClient::new(Arc::new(llm)));
    let shutdown = CancellationToken::new();
    let options = ConversationOptions { policy: cli.policy.into(), max_prompt_chars: cli.max_prompt_chars };
    let store = ConversationStore::with_session(completer, options, shutdown.child_token());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    let repl = repl::run(&store, stdin, &mut stdout, api_key_configured);
    tokio::pin!(repl);

    // Ctrl-C closes the session; the loop still runs to completion so a
    // pending reply is reported as discarded and output is flushed.
    tokio::select! {
        result = &mut repl => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(session_id = %store.session_id(), "interrupted");
            shutdown.cancel();
            repl.await?;
        }
    }

    shutdown.cancel();
    Ok(())
}
