//! Terminal front end for one assistant session.
//!
//! Reads one question per line, submits it, prints the reply. Generic over
//! the reader and writer so tests can drive it with in-memory buffers.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::llm::types::{LlmError, Role};
use crate::services::conversation::{ConversationStore, SubmitOutcome};

pub const PROMPT: &str = "> ";
pub const LOADING: &str = "PROCESSING QUERIES...";
pub const MISSING_KEY_WARNING: &str = "Warning: API Key not found. Responses will be simulated or fail.";

const BANNER: &str = "\
Sui Assistant (powered by Gemini)

Ask anything about Sui
  \"How do I create a Sui Move object?\"
  \"Explain Programmable Transaction Blocks.\"

Commands: /history, /clear, /exit
";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Exit,
    Clear,
    History,
    Ask(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "/exit" | "/quit" => Command::Exit,
        "/clear" => Command::Clear,
        "/history" => Command::History,
        _ => Command::Ask(line),
    }
}

/// Run the loop until `/exit`, end of input, or the session closes.
///
/// `api_key_configured` only controls the missing-key warning; the request
/// is attempted either way.
///
/// # Errors
///
/// Returns any I/O error from `input` or `out`.
pub async fn run<R, W>(
    store: &ConversationStore,
    input: R,
    out: &mut W,
    api_key_configured: bool,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    out.write_all(BANNER.as_bytes()).await?;
    let mut lines = input.lines();

    loop {
        out.write_all(PROMPT.as_bytes()).await?;
        out.flush().await?;

        // Buffered input wins; closing the session ends an idle read.
        let line = tokio::select! {
            biased;
            line = lines.next_line() => line?,
            () = store.closed() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Command::Exit => break,
            Command::Clear => {
                store.clear();
                out.write_all(b"History cleared.\n").await?;
            }
            Command::History => write_history(store, out).await?,
            Command::Ask(query) => {
                if query.trim().is_empty() {
                    continue;
                }
                out.write_all(format!("{LOADING}\n").as_bytes()).await?;
                out.flush().await?;

                match store.submit(query).await {
                    SubmitOutcome::Answered(completion) => {
                        out.write_all(format!("\n{}\n\n", completion.text()).as_bytes()).await?;
                        let missing_key = matches!(completion.error(), Some(LlmError::MissingApiKey { .. }));
                        if completion.is_fallback() && (missing_key || !api_key_configured) {
                            out.write_all(format!("{MISSING_KEY_WARNING}\n").as_bytes()).await?;
                        }
                    }
                    SubmitOutcome::Rejected(reason) => {
                        out.write_all(format!("Not sent: {reason}.\n").as_bytes()).await?;
                    }
                    SubmitOutcome::Abandoned => {
                        out.write_all(b"Reply discarded.\n").await?;
                    }
                    SubmitOutcome::Ignored => {}
                }
            }
        }

        if store.is_closed() {
            break;
        }
    }

    out.flush().await
}

async fn write_history<W>(store: &ConversationStore, out: &mut W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let messages = store.messages();
    if messages.is_empty() {
        return out.write_all(b"(no messages yet)\n").await;
    }
    for message in messages {
        let label = match message.role {
            Role::User => "you",
            Role::Model => "assistant",
        };
        out.write_all(format!("[{label}] {}\n", message.text).as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;
