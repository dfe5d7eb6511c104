use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A complete reply from the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatResponse {
    /// The reply text. Always present on success, possibly empty.
    pub content: String,
    /// Tool calls natively reported by the backend.
    ///
    /// Backends without native tool-call support leave this empty and let
    /// the consumer extract calls from [`content`](Self::content).
    pub tool_calls: Vec<ToolCall>,
    /// The reason the model finished generating.
    pub finish_reason: FinishReason,
    /// Token usage counters, when the backend reports them.
    pub usage: Option<Usage>,
}

/// The reason why a model reply has finished.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum FinishReason {
    /// The model has finished generating text.
    #[default]
    Stop,
    /// The model needs to call one or more tools.
    ToolCalls,
}

/// A request from the model to invoke a named tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// The identifier of this call, unique within one model reply.
    ///
    /// Synthesized by the extractor when the source format carries none.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The parsed arguments, or `None` if the raw text failed to parse
    /// as a JSON object.
    pub arguments: Option<Map<String, Value>>,
    /// The literal JSON text of the arguments as received.
    pub raw_arguments: String,
}

impl ToolCall {
    /// Creates a tool call from the raw argument text, parsing it into
    /// the argument map when it forms a JSON object.
    pub fn from_raw_arguments<I, N>(id: I, name: N, raw: &str) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        let arguments = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            raw_arguments: raw.to_owned(),
        }
    }
}

/// Token usage counters for one exchange.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct Usage {
    /// Tokens consumed by the prompt, including cached ones.
    pub prompt_tokens: u64,
    /// Tokens produced by the completion.
    pub completion_tokens: u64,
    /// The sum of prompt and completion tokens.
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_arguments() {
        let call =
            ToolCall::from_raw_arguments("call_1", "f", r#"{"x": 1}"#);
        assert_eq!(call.name, "f");
        assert_eq!(call.arguments.unwrap()["x"], 1);
        assert_eq!(call.raw_arguments, r#"{"x": 1}"#);
    }

    #[test]
    fn test_from_raw_arguments_malformed() {
        let call = ToolCall::from_raw_arguments("call_1", "f", "{oops");
        assert!(call.arguments.is_none());
        assert_eq!(call.raw_arguments, "{oops");
    }

    #[test]
    fn test_from_raw_arguments_non_object() {
        // A bare JSON array is valid JSON but not an argument mapping.
        let call = ToolCall::from_raw_arguments("call_1", "f", "[1, 2]");
        assert!(call.arguments.is_none());
    }
}
