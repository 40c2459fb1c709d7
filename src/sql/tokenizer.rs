use crate::errors;
use once_cell::sync::Lazy;
use std::collections::{HashSet, VecDeque};

/// The four statement verbs the front-end understands.
static KEYWORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| HashSet::from(["insert", "find", "update", "delete"]));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Literal,
    Number,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Splits one statement into tokens. Quoted literals keep their inner
/// spaces; the quotes themselves are dropped.
///
/// # Errors
/// Returns an `errors::Error::Syntax` on an unclosed quote or a character
/// outside the statement grammar.
pub fn tokenize(input: &str) -> Result<VecDeque<Token>, errors::Error> {
    let mut tokens = VecDeque::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == quote => break,
                        Some(c) => text.push(c),
                        None => return Err(err!(Syntax, "Unclosed text literal.")),
                    }
                }
                tokens.push_back(Token {
                    kind: TokenKind::Literal,
                    text,
                });
            }
            c if c.is_ascii_digit() => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_digit() {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                tokens.push_back(Token {
                    kind: TokenKind::Number,
                    text,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&c) = chars.peek() {
                    if !c.is_ascii_alphanumeric() && c != '_' {
                        break;
                    }
                    text.push(c);
                    chars.next();
                }
                let kind = if KEYWORDS.contains(text.to_lowercase().as_str()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                tokens.push_back(Token { kind, text });
            }
            ';' => {
                chars.next();
                tokens.push_back(Token {
                    kind: TokenKind::Semicolon,
                    text: ";".to_owned(),
                });
            }
            other => return Err(err!(Syntax, "Unexpected character '{}'.", other)),
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_insert_statement() {
        let tokens = tokenize("insert 1 '1 + 1'").unwrap();
        assert_eq!(
            Vec::from(tokens),
            vec![
                Token {
                    kind: TokenKind::Keyword,
                    text: "insert".to_owned()
                },
                Token {
                    kind: TokenKind::Number,
                    text: "1".to_owned()
                },
                Token {
                    kind: TokenKind::Literal,
                    text: "1 + 1".to_owned()
                },
            ]
        );
    }

    #[test]
    fn tokenizes_semicolon_terminated_statement() {
        assert_eq!(
            kinds("delete 20;"),
            vec![TokenKind::Keyword, TokenKind::Number, TokenKind::Semicolon]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = tokenize("FIND 3").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn non_keyword_words_are_identifiers() {
        let tokens = tokenize("select 3").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn double_quoted_literals_work() {
        let tokens = tokenize("update 2 \"two words\"").unwrap();
        assert_eq!(tokens[2].text, "two words");
    }

    #[test]
    fn unclosed_literal_is_an_error() {
        assert!(matches!(
            tokenize("insert 1 'oops"),
            Err(errors::Error::Syntax(_))
        ));
    }

    #[test]
    fn stray_characters_are_an_error() {
        assert!(matches!(
            tokenize("insert @ 1"),
            Err(errors::Error::Syntax(_))
        ));
    }
}
