//! The tool loop controller.
//!
//! Drives a model through a multi-turn tool-use conversation: send the
//! conversation, resolve tool calls from the reply, execute them in
//! order, feed the results back, and repeat until the model answers in
//! plain text or the iteration bound trips.

#[cfg(test)]
mod tests;

use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use serde_json::Value;
use solstice_model::{
    ChatMessage, ChatRequest, ChatResponse, ModelProvider,
    ModelProviderError, ToolCall, ToolResultMessage,
};
use tokio_util::sync::CancellationToken;

use crate::extract;
use crate::model_client::ModelClient;
use crate::prompt;
use crate::tool::{Outcome, Registry};

type ObserverFn = Box<dyn Fn(&str) + Send + Sync>;

/// The result of a normally completed loop run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopRun {
    /// The model's final answer.
    pub content: String,
    /// How many model exchanges the run used. Always at least 1.
    pub iterations: u32,
}

/// The ways a loop run can end without a final answer.
pub enum LoopError {
    /// The model backend failed. Fatal to the run, never retried here.
    Backend(Box<dyn ModelProviderError>),
    /// The iteration bound was reached before the model finished.
    Exhausted {
        /// The configured bound, which equals the iterations used.
        iterations: u32,
    },
    /// The run was cancelled at a blocking boundary.
    Cancelled,
    /// The loop was misconfigured.
    Config(String),
}

impl Display for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopError::Backend(err) => write!(f, "backend error: {err}"),
            LoopError::Exhausted { iterations } => {
                write!(f, "no final answer after {iterations} iteration(s)")
            }
            LoopError::Cancelled => write!(f, "run was cancelled"),
            LoopError::Config(reason) => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl Debug for LoopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl StdError for LoopError {}

/// [`ToolLoop`] builder.
pub struct ToolLoopBuilder {
    client: ModelClient,
    registry: Arc<Registry>,
    model: String,
    options: Value,
    max_iterations: u32,
    cancellation: CancellationToken,
    on_observer: Option<ObserverFn>,
}

impl ToolLoopBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            client: ModelClient::new(provider),
            registry: Arc::new(Registry::default()),
            model: String::new(),
            options: Value::Null,
            max_iterations: 10,
            cancellation: CancellationToken::new(),
            on_observer: None,
        }
    }

    /// Injects the tool registry to run against.
    #[inline]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the model identifier to request.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    /// Sets free-form provider options.
    #[inline]
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    /// Sets the maximum number of model exchanges per run.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Attaches a cancellation token checked at every blocking boundary.
    #[inline]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attaches a callback for observer-facing tool output.
    #[inline]
    pub fn on_observer(
        mut self,
        on_observer: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_observer = Some(Box::new(on_observer));
        self
    }

    /// Builds the loop.
    #[inline]
    pub fn build(self) -> ToolLoop {
        let ToolLoopBuilder {
            client,
            registry,
            model,
            options,
            max_iterations,
            cancellation,
            on_observer,
        } = self;
        ToolLoop {
            client,
            registry,
            model,
            options,
            max_iterations,
            cancellation,
            on_observer,
        }
    }
}

/// A tool loop instance.
///
/// The loop owns no conversation state between runs: each [`run`]
/// receives the prior turns, owns the conversation exclusively while it
/// appends to it, and discards it on return. One instance can serve
/// sequential runs; concurrent runs should each build their own loop and
/// share the [`Registry`] behind its `Arc`.
///
/// [`run`]: Self::run
pub struct ToolLoop {
    client: ModelClient,
    registry: Arc<Registry>,
    model: String,
    options: Value,
    max_iterations: u32,
    cancellation: CancellationToken,
    on_observer: Option<ObserverFn>,
}

impl ToolLoop {
    /// Runs the loop over the caller-supplied conversation until the
    /// model produces a final answer.
    ///
    /// When the registry is non-empty, a system message describing the
    /// available tools is prepended before the first exchange. Tool
    /// calls within one reply are executed strictly sequentially, in
    /// resolver order, so later tools and the next model turn observe a
    /// consistent effect history.
    pub async fn run(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<LoopRun, LoopError> {
        if self.max_iterations == 0 {
            return Err(LoopError::Config(
                "`max_iterations` must be at least 1".to_owned(),
            ));
        }

        let definitions = self.registry.definitions();
        let mut conversation = Vec::with_capacity(messages.len() + 1);
        if !definitions.is_empty() {
            conversation.push(ChatMessage::System(prompt::tool_instructions(
                &definitions,
            )));
        }
        conversation.extend(messages);

        for iteration in 1..=self.max_iterations {
            if self.cancellation.is_cancelled() {
                return Err(LoopError::Cancelled);
            }

            let req = ChatRequest {
                messages: conversation.clone(),
                tools: definitions.clone(),
                model: self.model.clone(),
                options: self.options.clone(),
            };
            let resp =
                self.client.send_chat(req).await.map_err(LoopError::Backend)?;

            let (calls, visible) = normalize_reply(&resp);
            if calls.is_empty() {
                // The sole normal-termination path.
                let content = if visible.is_empty() {
                    resp.content.trim().to_owned()
                } else {
                    visible
                };
                debug!("loop finished after {iteration} iteration(s)");
                return Ok(LoopRun {
                    content,
                    iterations: iteration,
                });
            }

            debug!(
                "iteration {iteration}: model requested {} tool call(s)",
                calls.len()
            );
            conversation.push(ChatMessage::Assistant(visible));
            for call in calls {
                if self.cancellation.is_cancelled() {
                    return Err(LoopError::Cancelled);
                }
                let outcome = self.run_tool(&call).await;
                if let (Some(text), Some(on_observer)) =
                    (&outcome.for_observer, &self.on_observer)
                {
                    on_observer(text);
                }
                conversation.push(ChatMessage::Tool(ToolResultMessage {
                    id: call.id,
                    content: outcome.for_model,
                }));
            }
        }

        Err(LoopError::Exhausted {
            iterations: self.max_iterations,
        })
    }

    /// Executes one tool call, downgrading every failure mode to an
    /// error outcome the model can react to.
    async fn run_tool(&self, call: &ToolCall) -> Outcome {
        let Some(tool) = self.registry.get(&call.name) else {
            warn!("tool not found: {}", call.name);
            return Outcome::error(format!(
                "Tool '{}' is not available. Use only the tools listed in \
                 the system instructions.",
                call.name
            ));
        };
        let Some(arguments) = call.arguments.clone() else {
            return Outcome::error(format!(
                "Arguments for tool '{}' are not a valid JSON object: {}",
                call.name, call.raw_arguments
            ));
        };

        trace!("running tool ({}) with args: {arguments:?}", call.id);
        match tool.execute(Value::Object(arguments)).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("tool '{}' failed: {}", call.name, err.reason());
                Outcome::error(format!(
                    "Tool '{}' failed: {}",
                    call.name,
                    err.reason()
                ))
            }
        }
    }
}

/// Normalizes one reply into (tool calls, visible content), preferring
/// natively reported calls over text extraction.
fn normalize_reply(resp: &ChatResponse) -> (Vec<ToolCall>, String) {
    if !resp.tool_calls.is_empty() {
        return (resp.tool_calls.clone(), resp.content.trim().to_owned());
    }
    let extraction = extract::resolve(&resp.content);
    (extraction.tool_calls, extraction.visible_content)
}
