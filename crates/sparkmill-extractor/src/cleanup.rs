//! Syntactic cleanup and repair of almost-JSON text
//!
//! Everything here is pure and string-aware: quotes, escapes and comments
//! are tracked so that punctuation inside string literals is never touched.

use regex::Regex;
use std::sync::LazyLock;

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence pattern is valid")
});

static PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:sure|okay|ok|certainly|of course)[,!.]?\s*)?(?:here(?:'s| is| are)\b[^\n{\[]*?:)\s*",
    )
    .expect("preamble pattern is valid")
});

/// Whether `text` is already a complete JSON object or array.
///
/// Delimiter check first so prose never pays for a parse attempt.
pub fn looks_structured(text: &str) -> bool {
    let trimmed = text.trim();
    let delimited = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    delimited && serde_json::from_str::<serde_json::Value>(trimmed).is_ok()
}

/// Strip code fences, preambles, leading prose lines and trailing commentary.
pub fn clean_markdown(text: &str) -> String {
    let mut body = text.trim().to_string();

    if let Some(block) = FENCED_BLOCK
        .captures_iter(&body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|inner| inner.contains('{') || inner.contains('['))
    {
        body = block.trim().to_string();
    } else if let Some(rest) = body.strip_prefix("```") {
        // Unterminated fence, usually a truncated response
        body = rest
            .split_once('\n')
            .map(|(_, tail)| tail)
            .unwrap_or("")
            .to_string();
    }
    body = body.replace("```", "");

    body = PREAMBLE.replace(&body, "").into_owned();

    let lines: Vec<&str> = body.lines().collect();
    if let Some(first) = lines.iter().position(|line| {
        let l = line.trim_start();
        l.starts_with('{') || l.starts_with('[')
    }) {
        body = lines[first..].join("\n");
    }

    if let Some(last) = body.rfind(['}', ']']) {
        body.truncate(last + 1);
    }

    body.trim().to_string()
}

/// Span from the first `{` to the last `}`, if any.
pub fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Whether braces and brackets balance outside string literals.
pub fn is_balanced(text: &str) -> bool {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && !in_string
}

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    Normal,
    Double,
    Single,
}

/// Heuristic repair of near-JSON.
///
/// Strips `//` and `/* */` comments, converts single-quoted strings to
/// double-quoted ones, quotes bare object keys, maps Python literals
/// (`True`, `False`, `None`) to JSON, drops trailing commas before a closing
/// bracket, and finally closes any brackets a truncated response left open.
pub fn heuristic_repair(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut state = ScanState::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match state {
            ScanState::Double => {
                out.push(c);
                if c == '\\' {
                    if let Some(&next) = chars.get(i + 1) {
                        out.push(next);
                        i += 1;
                    }
                } else if c == '"' {
                    state = ScanState::Normal;
                }
            }
            ScanState::Single => match c {
                '\\' => {
                    match chars.get(i + 1) {
                        Some('\'') => out.push('\''),
                        Some(&next) => {
                            out.push('\\');
                            out.push(next);
                        }
                        None => {}
                    }
                    i += 1;
                }
                '"' => out.push_str("\\\""),
                '\'' => {
                    out.push('"');
                    state = ScanState::Normal;
                }
                _ => out.push(c),
            },
            ScanState::Normal => match c {
                '"' => {
                    out.push('"');
                    state = ScanState::Double;
                }
                '\'' => {
                    out.push('"');
                    state = ScanState::Single;
                }
                '/' if chars.get(i + 1) == Some(&'/') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                '/' if chars.get(i + 1) == Some(&'*') => {
                    i += 2;
                    while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                        i += 1;
                    }
                    i += 2;
                    continue;
                }
                ',' => {
                    let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                    if !matches!(next, Some('}') | Some(']')) {
                        out.push(',');
                    }
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    let start = i;
                    while i < chars.len()
                        && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                    {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
                    let prev = out.chars().rev().find(|ch| !ch.is_whitespace());

                    if next == Some(&':') && matches!(prev, Some('{') | Some(',') | None) {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    } else {
                        match word.as_str() {
                            "true" | "True" => out.push_str("true"),
                            "false" | "False" => out.push_str("false"),
                            "null" | "None" | "undefined" => out.push_str("null"),
                            other if matches!(prev, Some(':') | Some('[') | Some(',')) => {
                                out.push('"');
                                out.push_str(other);
                                out.push('"');
                            }
                            other => out.push_str(other),
                        }
                    }
                    continue;
                }
                _ => out.push(c),
            },
        }
        i += 1;
    }

    if state != ScanState::Normal {
        out.push('"');
    }

    close_unbalanced(&out)
}

/// Append closers for brackets left open at the end of `text`.
///
/// Text whose brackets are mismatched (not merely unclosed) is returned as is.
pub fn close_unbalanced(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    return text.to_string();
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() && !in_string {
        return text.to_string();
    }

    let mut out = text.trim_end().to_string();
    if in_string {
        out.push('"');
    }
    while out.ends_with(',') || out.ends_with(':') {
        out.pop();
        out.truncate(out.trim_end().len());
    }
    while let Some(closer) = stack.pop() {
        out.push(closer);
    }
    out
}
