/// Statements produced by the parser, one variant per verb.
#[derive(Debug, PartialEq)]
pub enum Statement {
    Insert(InsertStatement),
    Find(FindStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

/// Represents an `insert <key> <value>` statement.
#[derive(Debug, PartialEq)]
pub struct InsertStatement {
    pub key: u64,
    pub value: String,
}

/// Represents a `find <key>` statement.
#[derive(Debug, PartialEq)]
pub struct FindStatement {
    pub key: u64,
}

/// Represents an `update <key> <value>` statement.
#[derive(Debug, PartialEq)]
pub struct UpdateStatement {
    pub key: u64,
    pub value: String,
}

/// Represents a `delete <key>` statement.
#[derive(Debug, PartialEq)]
pub struct DeleteStatement {
    pub key: u64,
}
