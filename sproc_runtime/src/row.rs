use crate::error::{SprocError, SprocResult};
use crate::value::{FromSql, SqlValue};

/// One row of a result table. Columns are addressed by 0-based position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> SprocResult<&SqlValue> {
        self.values.get(index).ok_or(SprocError::ColumnIndex {
            index,
            width: self.values.len(),
        })
    }

    /// Reads column `index` as `T`.
    pub fn get<T: FromSql>(&self, index: usize) -> SprocResult<T> {
        let value = self.value(index)?;
        T::from_sql(value).ok_or_else(|| SprocError::ColumnType {
            index,
            expected: std::any::type_name::<T>(),
            found: value.kind_name(),
        })
    }
}

impl From<Vec<SqlValue>> for Row {
    fn from(values: Vec<SqlValue>) -> Self {
        Self::new(values)
    }
}

/// Turns one row of a result table into a domain value.
pub trait RowMapper: Send + Sync {
    type Output: Send + 'static;

    fn map_row(&self, row: &Row, row_num: usize) -> SprocResult<Self::Output>;
}
