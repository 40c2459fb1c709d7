use super::statement::*;
use super::tokenizer::{Token, TokenKind};
use super::validator;
use crate::errors;
use std::collections::VecDeque;

/// Builds a `Statement` from the token queue produced by the tokenizer.
///
/// Grammar: `insert KEY VALUE`, `find KEY`, `update KEY VALUE`,
/// `delete KEY`, each optionally terminated by a single `;`.
///
/// # Errors
/// Returns an `errors::Error::Syntax` for an unknown verb, a malformed
/// key or value, or trailing input.
pub fn parse(mut tokens: VecDeque<Token>) -> Result<Statement, errors::Error> {
    let verb = match tokens.pop_front() {
        Some(t) if t.kind == TokenKind::Keyword => t.text.to_lowercase(),
        Some(t) => {
            return Err(err!(
                Syntax,
                "Statements must start with a verb, got '{}'.",
                t.text
            ))
        }
        None => return Err(err!(Syntax, "Empty statement.")),
    };
    let statement = match verb.as_str() {
        "insert" => Statement::Insert(parse_insert(&mut tokens)?),
        "find" => Statement::Find(parse_find(&mut tokens)?),
        "update" => Statement::Update(parse_update(&mut tokens)?),
        "delete" => Statement::Delete(parse_delete(&mut tokens)?),
        other => return Err(err!(Syntax, "Unknown verb '{}'.", other)),
    };
    expect_end(&mut tokens)?;
    Ok(statement)
}

fn parse_insert(tokens: &mut VecDeque<Token>) -> Result<InsertStatement, errors::Error> {
    let key = pop_key(tokens, "'insert' must be followed by a key.")?;
    let value = pop_value(tokens, "'insert <key>' must be followed by a value.")?;
    Ok(InsertStatement { key, value })
}

fn parse_find(tokens: &mut VecDeque<Token>) -> Result<FindStatement, errors::Error> {
    let key = pop_key(tokens, "'find' must be followed by a key.")?;
    Ok(FindStatement { key })
}

fn parse_update(tokens: &mut VecDeque<Token>) -> Result<UpdateStatement, errors::Error> {
    let key = pop_key(tokens, "'update' must be followed by a key.")?;
    let value = pop_value(tokens, "'update <key>' must be followed by a value.")?;
    Ok(UpdateStatement { key, value })
}

fn parse_delete(tokens: &mut VecDeque<Token>) -> Result<DeleteStatement, errors::Error> {
    let key = pop_key(tokens, "'delete' must be followed by a key.")?;
    Ok(DeleteStatement { key })
}

fn pop_key(tokens: &mut VecDeque<Token>, context: &str) -> Result<u64, errors::Error> {
    match tokens.pop_front() {
        Some(t) if matches!(t.kind, TokenKind::Number | TokenKind::Identifier) => {
            validator::validate_key(&t.text)
        }
        Some(t) => Err(err!(Syntax, "Expected a key, got '{}'.", t.text)),
        None => Err(err!(Syntax, "{}", context)),
    }
}

fn pop_value(tokens: &mut VecDeque<Token>, context: &str) -> Result<String, errors::Error> {
    match tokens.pop_front() {
        Some(t)
            if matches!(
                t.kind,
                TokenKind::Literal | TokenKind::Number | TokenKind::Identifier
            ) =>
        {
            validator::validate_value(&t.text)
        }
        Some(t) => Err(err!(Syntax, "Expected a value, got '{}'.", t.text)),
        None => Err(err!(Syntax, "{}", context)),
    }
}

/// Statements may end with one optional semicolon and nothing after it.
fn expect_end(tokens: &mut VecDeque<Token>) -> Result<(), errors::Error> {
    match tokens.pop_front() {
        None => Ok(()),
        Some(t) if t.kind == TokenKind::Semicolon && tokens.is_empty() => Ok(()),
        Some(t) => Err(err!(Syntax, "Unexpected trailing input near '{}'.", t.text)),
    }
}
