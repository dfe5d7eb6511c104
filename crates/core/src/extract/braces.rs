/// Finds the index one past the `}` matching the `{` at `open`.
///
/// The scan skips over string-literal content, so braces inside string
/// values never unbalance the count, and `\"` inside a string does not
/// end it. Returns `open` unchanged when the text ends before the brace
/// is closed; callers must treat that as "no match". A valid empty
/// object `{}` returns `open + 2`, so the no-match value can never be
/// confused with a real span.
pub(crate) fn find_matching_close(text: &str, open: usize) -> usize {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    open
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object() {
        assert_eq!(find_matching_close("{}", 0), 2);
    }

    #[test]
    fn test_nested_objects() {
        let text = r#"{"a": {"b": {}}} tail"#;
        assert_eq!(find_matching_close(text, 0), 16);
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"a": "}}}{{{"}"#;
        assert_eq!(find_matching_close(text, 0), text.len());
    }

    #[test]
    fn test_escaped_quote_before_brace_in_string() {
        // The `\"}` sequence stays inside the string; the scan must not
        // terminate at the brace that follows the escaped quote.
        let text = r#"{"a": "x\"}y"}"#;
        assert_eq!(find_matching_close(text, 0), text.len());
    }

    #[test]
    fn test_escaped_backslash_does_not_mistoggle() {
        // `\\` ends the escape, so the `"` after it closes the string.
        let text = r#"{"a": "x\\"}"#;
        assert_eq!(find_matching_close(text, 0), text.len());
    }

    #[test]
    fn test_unterminated_returns_open() {
        assert_eq!(find_matching_close(r#"{"a": 1"#, 0), 0);
        assert_eq!(find_matching_close(r#"xx{"a": "unclosed"#, 2), 2);
    }

    #[test]
    fn test_offset_open() {
        let text = r#"before {"x": 1} after"#;
        assert_eq!(find_matching_close(text, 7), 15);
    }
}
