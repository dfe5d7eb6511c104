use serde_json::Value;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatRequest {
    /// The input messages.
    pub messages: Vec<ChatMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ToolDefinition>,
    /// The model identifier, or empty for the provider's default.
    pub model: String,
    /// Free-form provider options.
    pub options: Value,
}

/// A complete message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
    /// A tool call result.
    Tool(ToolResultMessage),
}

/// The result of calling a tool, fed back into the conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolResultMessage {
    /// The identifier of the tool call this result answers.
    pub id: String,
    /// The result of the tool call.
    pub content: String,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ToolDefinition {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model backends, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub parameters: Value,
}
