//! A model provider backed by the `claude` CLI.
//!
//! Each exchange spawns one `claude -p` subprocess: the conversation is
//! flattened into a plain-text prompt on stdin, system messages travel
//! via `--system-prompt`, and the CLI's single JSON object on stdout is
//! decoded into a [`ChatResponse`]. The reply text is returned verbatim;
//! recognizing tool-call conventions inside it is the caller's job.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod proto;

use std::path::PathBuf;
use std::process::Stdio;

use solstice_model::{
    ChatMessage, ChatRequest, ChatResponse, ModelProvider, Usage,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub use crate::error::Error;
use crate::proto::CliResponse;

/// The model identifier that leaves model selection to the CLI.
pub const DEFAULT_MODEL: &str = "claude-code";

/// A [`ModelProvider`] that drives the `claude` CLI as a subprocess.
pub struct ClaudeCliProvider {
    command: String,
    workspace: Option<PathBuf>,
}

impl Default for ClaudeCliProvider {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ClaudeCliProvider {
    /// Creates a provider that runs `claude` from `PATH`.
    #[inline]
    pub fn new() -> Self {
        Self {
            command: "claude".to_owned(),
            workspace: None,
        }
    }

    /// Overrides the executable to spawn.
    #[inline]
    pub fn with_command<S: Into<String>>(mut self, command: S) -> Self {
        self.command = command.into();
        self
    }

    /// Sets the working directory for the subprocess.
    #[inline]
    pub fn with_workspace<P: Into<PathBuf>>(mut self, workspace: P) -> Self {
        self.workspace = Some(workspace.into());
        self
    }
}

impl ModelProvider for ClaudeCliProvider {
    type Error = Error;

    fn send_chat(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<ChatResponse, Self::Error>> + Send + 'static
    {
        let command = self.command.clone();
        let workspace = self.workspace.clone();
        let system_prompt = collect_system_prompt(&req.messages);
        let prompt = flatten_messages(&req.messages);
        let model = req.model.clone();

        async move {
            let mut cmd = Command::new(&command);
            cmd.args([
                "-p",
                "--output-format",
                "json",
                "--dangerously-skip-permissions",
                "--no-chrome",
            ]);
            if !system_prompt.is_empty() {
                cmd.args(["--system-prompt", &system_prompt]);
            }
            if !model.is_empty() && model != DEFAULT_MODEL {
                cmd.args(["--model", &model]);
            }
            cmd.arg("-");
            if let Some(dir) = &workspace {
                cmd.current_dir(dir);
            }
            cmd.stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            trace!("spawning `{command}` for one exchange");
            let mut child = cmd.spawn().map_err(|err| {
                Error::spawn_failed()
                    .with_reason(format!("failed to spawn `{command}`: {err}"))
            })?;

            // Closing stdin signals the end of the prompt.
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(prompt.as_bytes()).await.map_err(|err| {
                    Error::io().with_reason(err.to_string())
                })?;
            }

            let output = child.wait_with_output().await.map_err(|err| {
                Error::io().with_reason(err.to_string())
            })?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                return Err(if stderr.is_empty() {
                    Error::cli_failed()
                        .with_reason(format!("exited with {}", output.status))
                } else {
                    Error::cli_failed().with_reason(stderr.to_owned())
                });
            }

            decode_response(&String::from_utf8_lossy(&output.stdout))
        }
    }
}

/// Joins system messages into the `--system-prompt` payload.
fn collect_system_prompt(messages: &[ChatMessage]) -> String {
    let parts: Vec<&str> = messages
        .iter()
        .filter_map(|msg| match msg {
            ChatMessage::System(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    parts.join("\n\n")
}

/// Flattens the conversation into the stdin prompt.
///
/// System messages are omitted here, they travel as a CLI flag. A
/// conversation that is one user message collapses to its bare text.
fn flatten_messages(messages: &[ChatMessage]) -> String {
    let mut parts = Vec::new();
    for msg in messages {
        match msg {
            ChatMessage::System(_) => {}
            ChatMessage::User(text) => parts.push(format!("User: {text}")),
            ChatMessage::Assistant(text) => {
                parts.push(format!("Assistant: {text}"));
            }
            ChatMessage::Tool(result) => {
                parts.push(format!(
                    "[Tool Result for {}]: {}",
                    result.id, result.content
                ));
            }
        }
    }

    if let [only] = parts.as_slice() {
        if let Some(bare) = only.strip_prefix("User: ") {
            return bare.to_owned();
        }
    }
    parts.join("\n")
}

/// Decodes the CLI's JSON stdout into a [`ChatResponse`].
fn decode_response(output: &str) -> Result<ChatResponse, Error> {
    let resp: CliResponse = serde_json::from_str(output).map_err(|err| {
        Error::malformed_response()
            .with_reason(format!("failed to decode output: {err}"))
    })?;

    if resp.is_error {
        return Err(Error::cli_failed().with_reason(resp.result));
    }

    let usage = (resp.usage.input_tokens > 0 || resp.usage.output_tokens > 0)
        .then(|| {
            let prompt_tokens = resp.usage.input_tokens
                + resp.usage.cache_creation_input_tokens
                + resp.usage.cache_read_input_tokens;
            Usage {
                prompt_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: prompt_tokens + resp.usage.output_tokens,
            }
        });

    Ok(ChatResponse {
        content: resp.result,
        usage,
        ..Default::default()
    })
}
