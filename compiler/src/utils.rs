use crate::error::ProtoError;

/// Quote a token or name for an error message, escaping as JSON does.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn definition_error(msg: &str, line: usize, column: usize) -> ProtoError {
    ProtoError::Definition {
        msg: msg.to_owned(),
        line,
        column,
    }
}

/// Strip the surrounding quotes from a string literal token and process the
/// simple backslash escapes the grammar allows.
pub fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_handles_escapes() {
        assert_eq!(unquote("\"\""), "");
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("\"a\\nb\""), "a\nb");
        assert_eq!(unquote("\"a\\\\b\""), "a\\b");
    }
}
