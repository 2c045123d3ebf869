use thiserror::Error;

/// Result alias used by generated code and the runtime alike.
pub type SprocResult<T> = Result<T, SprocError>;

/// Errors surfaced by a stored-procedure call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SprocError {
    /// A single-row result table came back empty under the throw policy.
    #[error("procedure '{procedure}' returned no rows in '{table}' where exactly one was expected")]
    ObjectNotFound { procedure: String, table: String },

    /// A single-row result table held more than one row.
    #[error("procedure '{procedure}' returned {count} rows in '{table}' where at most one was expected")]
    TooManyResults {
        procedure: String,
        table: String,
        count: usize,
    },

    /// The call produced fewer result tables than were declared.
    #[error("procedure '{procedure}' did not produce result table '{table}'")]
    MissingResultTable { procedure: String, table: String },

    /// A result table was read back as a different row type than it was decoded into.
    #[error("result table '{table}' of procedure '{procedure}' does not hold rows of type {expected}")]
    ResultTableType {
        procedure: String,
        table: String,
        expected: &'static str,
    },

    #[error("procedure '{procedure}' takes {expected} arguments but {actual} were supplied")]
    ParameterCount {
        procedure: String,
        expected: usize,
        actual: usize,
    },

    #[error("column {index} is out of range for a row of {width} columns")]
    ColumnIndex { index: usize, width: usize },

    #[error("column {index} holds {found} which cannot be read as {expected}")]
    ColumnType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// The data source could not hand out a connection.
    #[error("failed to acquire connection: {0}")]
    Connection(String),

    /// The database rejected or aborted the call.
    #[error("call to '{procedure}' failed: {message}")]
    Call { procedure: String, message: String },
}
