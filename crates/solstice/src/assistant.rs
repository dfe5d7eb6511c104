use std::sync::Arc;

use solstice_core::tool::Registry;
use solstice_core::{LoopError, ToolLoop, ToolLoopBuilder};
use solstice_model::{ChatMessage, ModelProvider};

/// [`Assistant`] builder.
pub struct AssistantBuilder {
    loop_builder: ToolLoopBuilder,
    system_prompt: Option<String>,
}

impl AssistantBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            loop_builder: ToolLoopBuilder::with_model_provider(provider),
            system_prompt: None,
        }
    }

    /// Sets the persona instructions kept at the head of every
    /// conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Injects the tool registry the assistant runs against.
    #[inline]
    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.loop_builder = self.loop_builder.with_registry(registry);
        self
    }

    /// Sets the model identifier to request.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.loop_builder = self.loop_builder.with_model(model);
        self
    }

    /// Sets the maximum number of model exchanges per user turn.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.loop_builder =
            self.loop_builder.with_max_iterations(max_iterations);
        self
    }

    /// Attaches a callback for observer-facing tool output.
    #[inline]
    pub fn on_observer(
        mut self,
        on_observer: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.loop_builder = self.loop_builder.on_observer(on_observer);
        self
    }

    /// Builds the assistant.
    pub fn build(self) -> Assistant {
        let mut history = Vec::new();
        if let Some(prompt) = self.system_prompt {
            history.push(ChatMessage::System(prompt));
        }
        Assistant {
            tool_loop: self.loop_builder.build(),
            history,
        }
    }
}

/// A conversational assistant that keeps history across user turns.
///
/// Each [`chat`] call appends the user message, drives the tool loop to
/// a final answer, and appends that answer, so the next turn sees the
/// whole exchange. A turn that fails leaves the user message in place.
///
/// [`chat`]: Self::chat
pub struct Assistant {
    tool_loop: ToolLoop,
    history: Vec<ChatMessage>,
}

impl Assistant {
    /// Sends one user message and returns the final answer.
    pub async fn chat(&mut self, text: &str) -> Result<String, LoopError> {
        self.history.push(ChatMessage::User(text.to_owned()));
        let run = self.tool_loop.run(self.history.clone()).await?;
        self.history.push(ChatMessage::Assistant(run.content.clone()));
        Ok(run.content)
    }
}
