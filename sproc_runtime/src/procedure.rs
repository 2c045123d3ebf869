use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{SprocError, SprocResult};
use crate::row::{Row, RowMapper};
use crate::value::{SqlType, SqlValue};

const RESULT_TABLE_PREFIX: &str = "result-table-";

/// Name under which the `index`-th declared result table is stored.
pub fn result_table_name(index: usize) -> String {
    format!("{RESULT_TABLE_PREFIX}{index}")
}

/// A declared input parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlParameter {
    pub name: String,
    pub sql_type: SqlType,
}

impl SqlParameter {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// A live database connection able to run one stored-procedure call.
pub trait Connection {
    /// Runs `procedure` with positionally bound `args` and returns every
    /// result table it produced, in order.
    fn call(
        &self,
        procedure: &str,
        parameters: &[SqlParameter],
        args: &[SqlValue],
    ) -> SprocResult<Vec<Vec<Row>>>;

    /// Builds a database array value. Drivers with native array objects
    /// override this.
    fn create_array(&self, element_type: &str, elements: Vec<SqlValue>) -> SprocResult<SqlValue> {
        Ok(SqlValue::Array {
            element_type: element_type.to_string(),
            elements,
        })
    }
}

/// Hands out connections to the procedures built on it.
pub trait DataSource: Send + Sync {
    fn connection(&self) -> SprocResult<Box<dyn Connection>>;
}

trait TableDecoder: Send + Sync {
    fn decode(&self, rows: &[Row]) -> SprocResult<Box<dyn Any + Send>>;
}

impl<M: RowMapper> TableDecoder for M {
    fn decode(&self, rows: &[Row]) -> SprocResult<Box<dyn Any + Send>> {
        let mut decoded = Vec::with_capacity(rows.len());
        for (row_num, row) in rows.iter().enumerate() {
            decoded.push(self.map_row(row, row_num)?);
        }
        Ok(Box::new(decoded))
    }
}

struct DeclaredResult {
    name: String,
    decoder: Box<dyn TableDecoder>,
}

/// A callable stored procedure with its declared parameters and result tables.
pub struct StoredProcedure {
    data_source: Arc<dyn DataSource>,
    name: String,
    parameters: Vec<SqlParameter>,
    results: Vec<DeclaredResult>,
}

impl StoredProcedure {
    pub fn new(data_source: Arc<dyn DataSource>, name: impl Into<String>) -> Self {
        Self {
            data_source,
            name: name.into(),
            parameters: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn declare_parameter(mut self, parameter: SqlParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Declares the next result table and the mapper that decodes its rows.
    pub fn declare_result<M>(mut self, name: impl Into<String>, mapper: M) -> Self
    where
        M: RowMapper + 'static,
    {
        self.results.push(DeclaredResult {
            name: name.into(),
            decoder: Box::new(mapper),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[SqlParameter] {
        &self.parameters
    }

    pub fn result_names(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|result| result.name.as_str())
    }

    pub fn connection(&self) -> SprocResult<Box<dyn Connection>> {
        self.data_source.connection()
    }

    pub fn execute(&self, args: Vec<SqlValue>) -> SprocResult<CallResult> {
        let connection = self.connection()?;
        self.execute_on(connection.as_ref(), args)
    }

    /// Runs the call on an already acquired connection. Used when arguments
    /// had to be built against the same connection (arrays).
    pub fn execute_on(&self, connection: &dyn Connection, args: Vec<SqlValue>) -> SprocResult<CallResult> {
        if args.len() != self.parameters.len() {
            return Err(SprocError::ParameterCount {
                procedure: self.name.clone(),
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }

        tracing::debug!(procedure = %self.name, args = args.len(), "calling stored procedure");
        let raw_tables = connection.call(&self.name, &self.parameters, &args)?;
        if raw_tables.len() > self.results.len() {
            tracing::debug!(
                procedure = %self.name,
                returned = raw_tables.len(),
                declared = self.results.len(),
                "ignoring undeclared result tables"
            );
        }

        let mut tables = IndexMap::with_capacity(self.results.len());
        for (declared, rows) in self.results.iter().zip(raw_tables.iter()) {
            tables.insert(declared.name.clone(), declared.decoder.decode(rows)?);
        }

        Ok(CallResult {
            procedure: self.name.clone(),
            tables,
        })
    }
}

impl fmt::Debug for StoredProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredProcedure")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("results", &self.result_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Decoded result tables of one call, keyed by declared name.
pub struct CallResult {
    procedure: String,
    tables: IndexMap<String, Box<dyn Any + Send>>,
}

impl CallResult {
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Removes table `name` and returns its decoded rows.
    pub fn take_table<T: 'static>(&mut self, name: &str) -> SprocResult<Vec<T>> {
        let table = self
            .tables
            .shift_remove(name)
            .ok_or_else(|| SprocError::MissingResultTable {
                procedure: self.procedure.clone(),
                table: name.to_string(),
            })?;

        table
            .downcast::<Vec<T>>()
            .map(|rows| *rows)
            .map_err(|_| SprocError::ResultTableType {
                procedure: self.procedure.clone(),
                table: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

impl fmt::Debug for CallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallResult")
            .field("procedure", &self.procedure)
            .field("tables", &self.table_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_tables_are_numbered_from_zero() {
        assert_eq!(result_table_name(0), "result-table-0");
        assert_eq!(result_table_name(3), "result-table-3");
    }
}
