//! Per-dialect statement generation.
//!
//! A [`Grammar`] borrows one [`QueryInfo`] and turns it into a single
//! [`SqlExpression`] per call: `SELECT`, `COUNT`, `INSERT`, bulk `INSERT`,
//! `UPDATE`, `DELETE` and upsert. Every dialect restriction is checked before
//! any text is written, so an unsupported shape fails with
//! [`OrmError::NotSupported`](crate::OrmError::NotSupported) instead of
//! producing different SQL.
//!
//! ```ignore
//! let query = Query::new("TestTable", QueryConfig::sql_server()).limit(5);
//! assert_eq!(query.to_select()?.to_string(), "SELECT TOP (5) * FROM [TestTable]");
//! ```

mod base;
mod firebird;
mod mysql;
mod sqlite;
mod sqlserver;


pub use base::GrammarBase;
pub(crate) use base::write_param;
pub use firebird::FirebirdGrammar;
pub use mysql::MysqlGrammar;
pub use sqlite::SqliteGrammar;
pub use sqlserver::SqlServerGrammar;

use crate::column::Column;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::query::QueryInfo;
use crate::row::{Cell, Row};

/// Match and update columns of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Upsert {
    /// Columns identifying an existing row.
    pub where_columns: Vec<String>,
    /// Columns overwritten when the row exists.
    pub update_columns: Vec<String>,
}

impl Upsert {
    pub fn new<W, U>(
        where_columns: impl IntoIterator<Item = W>,
        update_columns: impl IntoIterator<Item = U>,
    ) -> Self
    where
        W: Into<String>,
        U: Into<String>,
    {
        Self {
            where_columns: where_columns.into_iter().map(Into::into).collect(),
            update_columns: update_columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Statement generation for one dialect over one query.
pub trait Grammar {
    /// Shared state and helpers.
    fn base(&self) -> &GrammarBase<'_>;

    fn info(&self) -> &QueryInfo {
        self.base().info()
    }

    fn select(&self) -> OrmResult<SqlExpression>;

    /// `SELECT COUNT(...)`. An aggregate `column` is selected as is.
    fn count(&self, column: Option<&Column>) -> OrmResult<SqlExpression> {
        self.base().count(column)
    }

    fn insert(&self, row: &Row) -> OrmResult<SqlExpression> {
        self.base().insert(row)
    }

    /// Insert and return the generated key.
    fn insert_get_id(&self, row: &Row, key: &str) -> OrmResult<SqlExpression>;

    /// `INSERT INTO table (columns) SELECT ...`
    fn insert_query(&self, select: &QueryInfo, columns: &[String]) -> OrmResult<SqlExpression> {
        self.base().insert_query(select, columns)
    }

    /// One statement per batch. Rows must share the same columns.
    fn bulk_insert(&self, rows: &[Row]) -> OrmResult<Vec<SqlExpression>> {
        self.base().bulk_insert_values(rows)
    }

    fn update(&self, cells: &[Cell]) -> OrmResult<SqlExpression>;

    fn delete(&self) -> OrmResult<SqlExpression>;

    /// Delete from the main table and every joined table.
    fn delete_including_joins(&self) -> OrmResult<SqlExpression>;

    fn upsert(&self, row: &Row, upsert: &Upsert) -> OrmResult<SqlExpression> {
        self.upsert_rows(std::slice::from_ref(row), upsert)
    }

    fn upsert_rows(&self, rows: &[Row], upsert: &Upsert) -> OrmResult<SqlExpression>;
}

/// Grammar for the query's configured dialect.
pub fn for_query(info: &QueryInfo) -> Box<dyn Grammar + '_> {
    match info.config.dialect {
        Dialect::SqlServer => Box::new(SqlServerGrammar::new(info)),
        Dialect::Mysql => Box::new(MysqlGrammar::new(info)),
        Dialect::Sqlite => Box::new(SqliteGrammar::new(info)),
        Dialect::Firebird => Box::new(FirebirdGrammar::new(info)),
    }
}
