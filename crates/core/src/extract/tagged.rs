use solstice_model::ToolCall;

use super::Spans;
use super::braces::find_matching_close;

/// Extracts inline pseudo-XML tool calls of the form
/// `<name>{...}</name>` (closing tag optional) from `text`.
///
/// Returns `None` when no valid tagged span exists. Candidates that do
/// not fully match are skipped byte by byte, so prose containing `<` or
/// `{` is never consumed by accident.
pub(super) fn extract(text: &str) -> Option<Spans> {
    let spans = parse_spans(text);
    if spans.consumed.is_empty() {
        return None;
    }
    Some(spans)
}

fn parse_spans(text: &str) -> Spans {
    let bytes = text.as_bytes();
    let mut calls = Vec::new();
    let mut consumed = Vec::new();

    let mut i = 0;
    while i < bytes.len() {
        let Some(rel) = bytes[i..].iter().position(|&b| b == b'<') else {
            break;
        };
        let start = i + rel;
        if start + 1 >= bytes.len() {
            break;
        }

        // Skip closing tags and invalid tag-name starts.
        if bytes[start + 1] == b'/' || !is_tag_name_start(bytes[start + 1]) {
            i = start + 1;
            continue;
        }

        let name_start = start + 1;
        let mut name_end = name_start;
        while name_end < bytes.len() && is_tag_name_char(bytes[name_end]) {
            name_end += 1;
        }
        if name_end >= bytes.len() || bytes[name_end] != b'>' {
            i = start + 1;
            continue;
        }
        let name = &text[name_start..name_end];

        let mut json_start = name_end + 1;
        while json_start < bytes.len() && is_whitespace(bytes[json_start]) {
            json_start += 1;
        }
        if json_start >= bytes.len() || bytes[json_start] != b'{' {
            i = start + 1;
            continue;
        }

        let json_end = find_matching_close(text, json_start);
        if json_end == json_start {
            i = start + 1;
            continue;
        }
        let raw = &text[json_start..json_end];
        let call = ToolCall::from_raw_arguments(
            format!("call_tag_{}", calls.len() + 1),
            name,
            raw,
        );
        if call.arguments.is_none() {
            // The span must be a JSON object to count as a call.
            i = start + 1;
            continue;
        }

        let mut span_end = json_end;
        let mut after = json_end;
        while after < bytes.len() && is_whitespace(bytes[after]) {
            after += 1;
        }
        let closing = format!("</{name}>");
        if text[after..].starts_with(&closing) {
            span_end = after + closing.len();
        }

        calls.push(call);
        consumed.push(start..span_end);
        // Resume after the consumed span, never inside the matched JSON.
        i = span_end;
    }

    Spans { calls, consumed }
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\n' || b == b'\r' || b == b'\t'
}

#[inline]
fn is_tag_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

#[inline]
fn is_tag_name_char(b: u8) -> bool {
    is_tag_name_start(b) || b.is_ascii_digit()
}
