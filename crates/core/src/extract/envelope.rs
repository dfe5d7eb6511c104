use serde::Deserialize;
use solstice_model::ToolCall;

use super::Spans;
use super::braces::find_matching_close;

/// The literal prefix that opens a structured tool-call envelope.
pub(crate) const MARKER: &str = "{\"tool_calls\"";

#[derive(Deserialize)]
struct Envelope {
    tool_calls: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    /// The arguments are double-encoded: a JSON string containing JSON.
    #[serde(default)]
    arguments: String,
}

/// Extracts tool calls from the first structured envelope in `text`.
///
/// Returns `None` when no envelope marker is present, or when the
/// marker's brace never closes (a truncated or hallucinated marker must
/// not consume the reply). A present, brace-matched envelope always
/// yields a result, even when its body fails to decode; in that case
/// the call list is empty but the span is still consumed.
pub(super) fn extract(text: &str) -> Option<Spans> {
    let start = text.find(MARKER)?;
    let end = find_matching_close(text, start);
    if end == start {
        return None;
    }

    let calls = match serde_json::from_str::<Envelope>(&text[start..end]) {
        Ok(envelope) => envelope
            .tool_calls
            .into_iter()
            .map(|entry| {
                ToolCall::from_raw_arguments(
                    entry.id,
                    entry.function.name,
                    &entry.function.arguments,
                )
            })
            .collect(),
        Err(err) => {
            debug!("envelope body failed to decode: {err}");
            Vec::new()
        }
    };

    Some(Spans {
        calls,
        consumed: vec![start..end],
    })
}
