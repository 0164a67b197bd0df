use std::io::{self, Write};

use anyhow::{bail, Result};

use crate::config::Config;
use crate::llm::GeminiClient;
use crate::prompts;
use crate::session::SessionManager;
use crate::streaming::send_streaming;

/// Send a single question and print the reply as it streams in
pub async fn ask(config: &Config, prompt: &str) -> Result<()> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("Nothing to ask");
    }

    let client = GeminiClient::new(config)?;
    let mut sessions = SessionManager::new(client, config.chat_settings());
    let session = sessions.get_session();

    let mut stdout = io::stdout();
    let result = send_streaming(session.as_ref(), prompt, |fragment| {
        // A closed stdout is not worth aborting the reply over
        let _ = write!(stdout, "{fragment}").and_then(|_| stdout.flush());
    })
    .await;
    println!();

    if let Err(error) = result {
        tracing::error!(%error, "ask failed");
        eprintln!("{}", prompts::APOLOGY);
        bail!(error);
    }

    Ok(())
}

pub fn list_suggestions() {
    println!("💡 Câu hỏi gợi ý:");
    println!("{}", "=".repeat(50));

    for (index, suggestion) in prompts::SUGGESTIONS.iter().enumerate() {
        println!("{}. {}", index + 1, suggestion.label);
        println!("   {}", suggestion.prompt);
    }

    println!();
    println!("Dùng F1-F4 hoặc /suggest N trong màn hình trò chuyện.");
}
