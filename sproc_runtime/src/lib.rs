/* Stored-Procedure Runtime
 *
 * Support library linked by generated data-access code. Generated wrappers
 * build on `StoredProcedure`, generated DAO methods unpack the returned
 * `CallResult` through the `cardinality` helpers, and generated mappers
 * implement `RowMapper`.
 */

pub mod cardinality;
pub mod error;
pub mod interceptor;
pub mod procedure;
pub mod row;
pub mod value;

pub use error::{SprocError, SprocResult};
pub use interceptor::{CallRegistry, CallTimer, CallToken, Interceptor, InterceptorError};
pub use procedure::{
    result_table_name, CallResult, Connection, DataSource, SqlParameter, StoredProcedure,
};
pub use row::{Row, RowMapper};
pub use value::{FromSql, SqlType, SqlValue, ToSql};
