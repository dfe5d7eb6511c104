//! A terminal front end for chatting with the assistant.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::sync::Arc;

use owo_colors::OwoColorize;
use solstice::AssistantBuilder;
use solstice::tools::{
    ArxivSearchTool, CrossrefSearchTool, DdgInstantAnswerTool,
    MarkdownFileTool,
};
use solstice_bus::MessageBus;
use solstice_claude_cli_model::ClaudeCliProvider;
use solstice_core::tool::Registry;
use tokio::io::{self, AsyncBufReadExt};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let workspace =
        env::var("SOLSTICE_WORKSPACE").unwrap_or_else(|_| ".".to_owned());
    let model = env::var("SOLSTICE_MODEL").unwrap_or_default();

    let provider = ClaudeCliProvider::new().with_workspace(&workspace);

    let (bus, mut outbound_rx) = MessageBus::new();

    let mut registry = Registry::default();
    registry.add_tool(
        MarkdownFileTool::new(&workspace)
            .restricted()
            .with_bus(bus.clone())
            .with_route("cli", "local"),
    );
    registry.add_tool(ArxivSearchTool::new());
    registry.add_tool(DdgInstantAnswerTool::new());
    registry.add_tool(CrossrefSearchTool::new());

    // The CLI is its own delivery channel: outbound messages land here.
    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let bar = BAR_CHAR.bright_magenta();
            if !msg.file_path.is_empty() {
                println!(
                    "{bar}📎 {} ({})",
                    msg.file_name.bold(),
                    msg.file_path
                );
            }
            println!("{bar}{}", msg.content);
        }
    });

    let mut assistant = AssistantBuilder::with_model_provider(provider)
        .with_system_prompt(include_str!("./system_prompt.md"))
        .with_registry(Arc::new(registry))
        .with_model(model)
        .on_observer(|text| {
            println!("{}{}", BAR_CHAR.bright_yellow(), text.dimmed());
        })
        .build();

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match assistant.chat(line).await {
            Ok(reply) => {
                println!(
                    "{}🤖 {}",
                    BAR_CHAR.bright_cyan(),
                    reply.bright_white()
                );
            }
            Err(err) => {
                error!("chat turn failed: {err}");
                eprintln!("{}", format!("error: {err}").red());
            }
        }
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
