//! DELETE and soft-delete statements.

use tracing::debug;

use super::{QueryCompiler, Statement};
use crate::error::{QueryError, Result};
use crate::filter::Filter;
use crate::ident;
use crate::params::Params;
use crate::value::SqlValue;

impl QueryCompiler {
    /// `DELETE FROM table WHERE ...`, or `UPDATE table SET soft = 1 WHERE ...`
    /// when `soft_delete` names a flag column.
    ///
    /// The filter must bind at least one value; deleting every row by
    /// omission fails with [`QueryError::NoFilterForDelete`]. The soft-delete
    /// guard is not added to the filter, so already-flagged rows match too.
    pub fn delete(&self, table: &str, filter: &Filter, soft_delete: Option<&str>) -> Result<Statement> {
        if filter.param_count() == 0 {
            return Err(QueryError::NoFilterForDelete);
        }
        let dialect = self.dialect();
        let table = self.table(table)?;
        let mut params = Params::new(dialect);
        let head = match soft_delete {
            Some(column) => {
                let column = ident::quote(dialect, column)?;
                let flag = params.push(SqlValue::Int(1));
                format!("UPDATE {table} SET {column} = {flag}")
            }
            None => format!("DELETE FROM {table}"),
        };
        let where_clause = self
            .where_clause(filter, None, &mut params)?
            .ok_or(QueryError::NoFilterForDelete)?;
        let sql = format!("{head} {where_clause}");
        debug!(sql = %sql, params = params.len(), "compiled delete");
        Ok(Statement::execute(sql, params.into_values()))
    }
}
