//! The statement front-end: a tokenizer, a parser, and the dispatch onto
//! the tree's programmatic surface.

pub mod parser;
pub mod statement;
pub mod tokenizer;
mod validator;

use crate::errors::Error;
use crate::storage::Tree;
use self::statement::Statement;
use tracing::info;

/// Runs one statement against the store and renders a printable reply.
pub fn execute(tree: &mut Tree, input: &str) -> Result<String, Error> {
    let tokens = tokenizer::tokenize(input)?;
    let statement = parser::parse(tokens)?;
    info!(?statement, "Executing statement");
    match statement {
        Statement::Insert(stmt) => {
            tree.insert(stmt.key, stmt.value.as_bytes())?;
            Ok(format!("Inserted key {}.", stmt.key))
        }
        Statement::Find(stmt) => {
            let value = tree.find(stmt.key)?;
            Ok(String::from_utf8_lossy(&value).to_string())
        }
        Statement::Update(stmt) => {
            tree.update(stmt.key, stmt.value.as_bytes())?;
            Ok(format!("Updated key {}.", stmt.key))
        }
        Statement::Delete(stmt) => {
            tree.delete(stmt.key)?;
            Ok(format!("Deleted key {}.", stmt.key))
        }
    }
}
