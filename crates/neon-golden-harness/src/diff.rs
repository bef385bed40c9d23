//! Rendering of expected vs actual output.

/// Render raw bytes as a quoted, escaped literal.
#[must_use]
pub fn render_bytes(bytes: &[u8]) -> String {
    format!("\"{}\"", bytes.escape_ascii())
}

/// Render a line diff between expected and actual text.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let e = expected_lines.get(i);
        let a = actual_lines.get(i);
        if e == a {
            continue;
        }
        out.push_str(&format!("@@ line {} @@\n", i + 1));
        if let Some(e) = e {
            out.push_str(&format!("-{e}\n"));
        }
        if let Some(a) = a {
            out.push_str(&format!("+{a}\n"));
        }
    }
    if expected.ends_with('\n') != actual.ends_with('\n') {
        out.push_str("@@ trailing newline differs @@\n");
    }
    out
}

/// Line diff for captured streams, when both sides are multi-line UTF-8 text.
#[must_use]
pub fn render_stream_diff(expected: &[u8], actual: &[u8]) -> Option<String> {
    let expected = std::str::from_utf8(expected).ok()?;
    let actual = std::str::from_utf8(actual).ok()?;
    if expected.lines().count() < 2 && actual.lines().count() < 2 {
        return None;
    }
    Some(render_diff(expected, actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_escaped() {
        assert_eq!(render_bytes(b"42\n"), "\"42\\n\"");
        assert_eq!(render_bytes(b"\xff\t"), "\"\\xff\\t\"");
        assert_eq!(render_bytes(b""), "\"\"");
    }

    #[test]
    fn identical_text() {
        assert_eq!(render_diff("a\nb\n", "a\nb\n"), "[identical]");
    }

    #[test]
    fn changed_and_extra_lines() {
        let diff = render_diff("a\nb\n", "a\nc\nd\n");
        assert!(diff.contains("@@ line 2 @@\n-b\n+c\n"), "{diff}");
        assert!(diff.contains("@@ line 3 @@\n+d\n"), "{diff}");
        assert!(!diff.contains("line 1"), "{diff}");
    }

    #[test]
    fn missing_trailing_newline_is_visible() {
        let diff = render_diff("a\n", "a");
        assert!(diff.contains("trailing newline"), "{diff}");
    }

    #[test]
    fn single_line_streams_skip_line_diff() {
        assert!(render_stream_diff(b"42\n", b"43\n").is_none());
        assert!(render_stream_diff(b"1\n2\n", b"1\n3\n").is_some());
        assert!(render_stream_diff(b"\xff\n\n", b"1\n2\n").is_none());
    }
}
