//! SELECT and COUNT statements.

use tracing::debug;

use super::{join_clauses, Page, QueryCompiler, Statement};
use crate::error::Result;
use crate::filter::Filter;
use crate::params::Params;
use crate::sort::{compile_order_by, Sort};
use crate::value::SqlValue;

impl QueryCompiler {
    /// `SELECT * FROM table [WHERE ...] [ORDER BY ...] [LIMIT n OFFSET m]`.
    ///
    /// With a [`Page`], limit and offset (`page * limit`) are bound after the
    /// filter values.
    pub fn select(
        &self,
        table: &str,
        filter: &Filter,
        sort: &Sort,
        soft_delete: Option<&str>,
        page: Option<Page>,
    ) -> Result<Statement> {
        let dialect = self.dialect();
        let table = self.table(table)?;
        let mut params = Params::new(dialect);
        let where_clause = self
            .where_clause(filter, soft_delete, &mut params)?
            .unwrap_or_default();
        let order_by = compile_order_by(dialect, sort)?;
        let paging = match page {
            Some(page) => {
                let limit = params.push(SqlValue::Int(clamp_i64(page.limit)));
                let offset = params.push(SqlValue::Int(clamp_i64(page.offset())));
                format!("LIMIT {limit} OFFSET {offset}")
            }
            None => String::new(),
        };
        let head = format!("SELECT * FROM {table}");
        let sql = join_clauses([
            head.as_str(),
            where_clause.as_str(),
            order_by.as_str(),
            paging.as_str(),
        ]);
        debug!(sql = %sql, params = params.len(), "compiled select");
        Ok(Statement::query(sql, params.into_values()))
    }

    /// `SELECT count(*) AS number FROM table [WHERE ...]`.
    pub fn count(&self, table: &str, filter: &Filter, soft_delete: Option<&str>) -> Result<Statement> {
        let table = self.table(table)?;
        let mut params = Params::new(self.dialect());
        let where_clause = self
            .where_clause(filter, soft_delete, &mut params)?
            .unwrap_or_default();
        let head = format!("SELECT count(*) AS number FROM {table}");
        let sql = join_clauses([head.as_str(), where_clause.as_str()]);
        debug!(sql = %sql, params = params.len(), "compiled count");
        Ok(Statement::query(sql, params.into_values()))
    }
}

fn clamp_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
