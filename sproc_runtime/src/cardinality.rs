/* Single-row unpacking rules applied by generated DAO methods */

use crate::error::{SprocError, SprocResult};

/// Returns the only row of `rows`. Zero rows is `ObjectNotFound`, more than
/// one is `TooManyResults`.
pub fn exactly_one<T>(rows: Vec<T>, procedure: &str, table: &str) -> SprocResult<T> {
    match at_most_one(rows, procedure, table)? {
        Some(row) => Ok(row),
        None => Err(SprocError::ObjectNotFound {
            procedure: procedure.to_string(),
            table: table.to_string(),
        }),
    }
}

/// Returns the only row of `rows`, or `None` when the table is empty. More
/// than one row is `TooManyResults`.
pub fn at_most_one<T>(mut rows: Vec<T>, procedure: &str, table: &str) -> SprocResult<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        count => Err(SprocError::TooManyResults {
            procedure: procedure.to_string(),
            table: table.to_string(),
            count,
        }),
    }
}
