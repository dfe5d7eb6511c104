//! Builds the system instructions that teach the model how to request
//! tools.
//!
//! The instructions document only the structured envelope; the tagged
//! form is a tolerated deviation that models emit anyway, recognized by
//! [`extract`](crate::extract) but never advertised.

use solstice_model::ToolDefinition;

/// Renders the tool-use section of the system prompt.
///
/// The envelope example is load-bearing: extraction looks for exactly
/// this shape, so the wording must stay in sync with
/// [`extract::resolve`](crate::extract::resolve).
pub fn tool_instructions(tools: &[ToolDefinition]) -> String {
    let mut out = String::new();

    out.push_str("## Available Tools\n\n");
    out.push_str(
        "When you need to use a tool, respond with ONLY a JSON object:\n\n",
    );
    out.push_str("```json\n");
    out.push_str(
        r#"{"tool_calls":[{"id":"call_xxx","type":"function","function":{"name":"tool_name","arguments":"{...}"}}]}"#,
    );
    out.push_str("\n```\n\n");
    out.push_str(
        "CRITICAL: The 'arguments' field MUST be a JSON-encoded STRING.\n\n",
    );
    out.push_str("### Tool Definitions:\n\n");

    for tool in tools {
        out.push_str(&format!("#### {}\n", tool.name));
        if !tool.description.is_empty() {
            out.push_str(&format!("Description: {}\n", tool.description));
        }
        if !tool.parameters.is_null() {
            let params = serde_json::to_string(&tool.parameters)
                .unwrap_or_default();
            out.push_str(&format!("Parameters:\n```json\n{params}\n```\n"));
        }
        out.push('\n');
    }

    out
}
