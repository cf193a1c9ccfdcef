use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::tools::default_tools;
use crate::chat::Chat;
use crate::core::AppConfig;
use crate::workspace::Workspace;

/// Terminal chat loop. Tool invocation results are projected through
/// a workspace and printed as cards after each turn.
pub async fn run() -> Result<()> {
    let mut rl = DefaultEditor::new().expect("Editor failed");

    let config = AppConfig::default();
    let mut chat = Chat::builder(
        &config.openai_api_hostname,
        &config.openai_api_key,
        &config.openai_model,
    )
    .system_message(&config.system_message)
    .tools(default_tools())
    .build();

    let mut workspace = Workspace::default();

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let messages = chat.next_msg(line.as_str()).await?;

                if let Some(reply) = messages.iter().rev().find(|m| !m.text.is_empty()) {
                    println!("{}", reply.text);
                }

                workspace.sync(chat.transcript());
                for card in workspace.cards() {
                    if let Some(text) = workspace.render(card) {
                        println!("[{}] {}", card.kind, text);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
