use crate::error::ProtoError;
use crate::utils::quote;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#""[^"\\\n]*(?:\\.[^"\\\n]*)*"|//[^\n]*|\s+|-?(?:0|[1-9][0-9]*)|[{}\[\]=;,]|\.?[A-Za-z][A-Za-z0-9_]*(?:\.[A-Za-z][A-Za-z0-9_]*)*"#
    )
    .unwrap();
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Splits IDL text into tokens, skipping whitespace and `//` comments and
/// tracking 1-based line/column positions. The final token is an empty
/// end-of-input marker.
pub fn tokenize(text: &str) -> Result<Vec<Token>, ProtoError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let end = mat.end();
        let part = mat.as_str();

        if start > last_end {
            return Err(lexical_error(&text[last_end..start], line, column));
        }

        let skip = part.starts_with("//") || part.chars().next().is_some_and(char::is_whitespace);
        if !skip {
            tokens.push(Token {
                text: part.to_string(),
                line,
                column,
            });
        }

        // Update line/column
        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.len() + 1;
            }
        } else {
            column += part.len();
        }

        last_end = end;
    }

    if last_end != text.len() {
        return Err(lexical_error(&text[last_end..], line, column));
    }

    // Append EOF token
    tokens.push(Token {
        text: "".to_string(),
        line,
        column,
    });
    Ok(tokens)
}

fn lexical_error(unexpected: &str, line: usize, column: usize) -> ProtoError {
    let msg = if unexpected.starts_with('"') {
        "Unterminated string literal".to_owned()
    } else {
        let first: String = unexpected.chars().take(1).collect();
        format!("Unexpected character {}", quote(&first))
    };
    ProtoError::Lexical { msg, line, column }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_field() {
        let input = "required int32 age = 2;";
        let expected = vec![
            Token { text: "required".into(), line: 1, column: 1 },
            Token { text: "int32".into(),    line: 1, column: 10 },
            Token { text: "age".into(),      line: 1, column: 16 },
            Token { text: "=".into(),        line: 1, column: 20 },
            Token { text: "2".into(),        line: 1, column: 22 },
            Token { text: ";".into(),        line: 1, column: 23 },
            Token { text: "".into(),         line: 1, column: 24 },
        ];
        let got = tokenize(input).unwrap();
        assert_eq!(got, expected);
    }

    #[test]
    fn tokenize_dotted_references() {
        let got = tokenize("foo.Bar .baz.Qux").unwrap();
        assert_eq!(got[0].text, "foo.Bar");
        assert_eq!(got[1].text, ".baz.Qux");
    }

    #[test]
    fn tokenize_skips_comments() {
        let input = "message A { // a comment\n}";
        let got = tokenize(input).unwrap();
        assert_eq!(got[0].text, "message");
        assert_eq!(got[1].text, "A");
        assert_eq!(got[2].text, "{");
        assert_eq!(got[3].text, "}");
        assert_eq!(got[3].line, 2);
        assert_eq!(got[3].column, 1);
    }

    #[test]
    fn tokenize_string_literals() {
        let got = tokenize(r#"option name = "a \"b\" c";"#).unwrap();
        assert_eq!(got[3].text, r#""a \"b\" c""#);
    }

    #[test]
    fn tokenize_splits_leading_zero_numbers() {
        // "07" is not a single numeric literal; it lexes as "0" then "7" and
        // the parser rejects the sequence.
        let got = tokenize("= 07;").unwrap();
        assert_eq!(got[1].text, "0");
        assert_eq!(got[2].text, "7");
    }

    #[test]
    fn tokenize_unterminated_string() {
        let err = tokenize("option name = \"oops").unwrap_err();
        match err {
            ProtoError::Lexical { msg, line, column } => {
                assert!(msg.contains("Unterminated"));
                assert_eq!(line, 1);
                assert_eq!(column, 15);
            }
            other => panic!("expected a lexical error, got {:?}", other),
        }
    }

    #[test]
    fn tokenize_unexpected_character() {
        let err = tokenize("message A @").unwrap_err();
        assert!(matches!(err, ProtoError::Lexical { .. }), "{:?}", err);
    }
}
