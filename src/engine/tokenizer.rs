//! engine::tokenizer
//!
//! Splits a single command-line string into tokens.
//!
//! # Rules
//!
//! - Unquoted whitespace separates tokens
//! - A double quote toggles literal mode and is removed; whitespace inside
//!   quotes belongs to the token
//! - Quoted and unquoted segments with no whitespace between them form one
//!   token, so `--str="a b"` is the single token `--str=a b`
//! - `""` on its own is an empty token
//! - Single quotes and backslashes have no special meaning
//!
//! There is no escape for a double quote. An embedded quote ends the quoted
//! section early and the remainder becomes separate tokens, which normally
//! makes the command fail on an unknown token.

use thiserror::Error;

/// Errors from tokenizing a command line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A double quote opened at this byte offset is never closed.
    #[error("unterminated quote starting at offset {0}")]
    UnterminatedQuote(usize),
}

/// Split `line` into tokens.
///
/// # Example
///
/// ```
/// use cmdtree::engine::tokenizer::tokenize;
///
/// let tokens = tokenize(r#"type --str "hello world" -i42"#).unwrap();
/// assert_eq!(tokens, ["type", "--str", "hello world", "-i42"]);
/// ```
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // A token exists once a character or a quote pair was seen
    let mut started = false;
    let mut open_quote: Option<usize> = None;

    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => {
                open_quote = match open_quote {
                    Some(_) => None,
                    None => Some(idx),
                };
                started = true;
            }
            c if c.is_whitespace() && open_quote.is_none() => {
                if started {
                    tokens.push(std::mem::take(&mut current));
                    started = false;
                }
            }
            c => {
                current.push(c);
                started = true;
            }
        }
    }

    if let Some(idx) = open_quote {
        return Err(TokenizeError::UnterminatedQuote(idx));
    }
    if started {
        tokens.push(current);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", &[] ; "empty input")]
    #[test_case("   \t ", &[] ; "only whitespace")]
    #[test_case("type --int 42", &["type", "--int", "42"] ; "plain words")]
    #[test_case("  a   b  ", &["a", "b"] ; "runs of whitespace")]
    #[test_case(r#"--str "a  b""#, &["--str", "a  b"] ; "quoted whitespace kept")]
    #[test_case(r#"--str="a b""#, &["--str=a b"] ; "adjacent segments join")]
    #[test_case(r#"x"y"z"#, &["xyz"] ; "quotes inside word")]
    #[test_case(r#""" a"#, &["", "a"] ; "empty quoted token")]
    #[test_case(r#"-s 'single quoted'"#, &["-s", "'single", "quoted'"] ; "single quotes are plain")]
    #[test_case(r#"C:\path\to"#, &[r#"C:\path\to"#] ; "backslashes are plain")]
    fn splits(line: &str, expected: &[&str]) {
        assert_eq!(tokenize(line).unwrap(), expected);
    }

    #[test]
    fn embedded_quote_breaks_value() {
        let tokens = tokenize(r#"type --str "string \"with double quote\" doesn't work""#).unwrap();
        assert_eq!(
            tokens,
            ["type", "--str", r#"string \with"#, "double", r#"quote\ doesn't work"#]
        );
    }

    #[test]
    fn unterminated_quote_reports_offset() {
        assert_eq!(tokenize(r#"a "b c"#), Err(TokenizeError::UnterminatedQuote(2)));
    }

    #[test]
    fn multibyte_text_kept() {
        assert_eq!(tokenize("-s \"żółw 🐢\"").unwrap(), ["-s", "żółw 🐢"]);
    }
}
