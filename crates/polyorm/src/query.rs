//! Dialect-independent query state and the fluent API that mutates it.

use crate::column::{Column, ColumnOrder};
use crate::condition::{Condition, ConditionGroup};
use crate::config::QueryConfig;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::grammar::{self, Grammar};
use crate::member::{ExpressionConfig, ExpressionProcessor, MemberExpr};
use crate::value::Value;

/// Table name with optional alias.
///
/// `TableName::new("TestTable t1")` and `TableName::new("TestTable AS t1")`
/// both parse the alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    name: String,
    alias: Option<String>,
}

impl TableName {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let parts: Vec<&str> = raw.as_ref().split_whitespace().collect();
        match parts.as_slice() {
            [name, kw, alias] if kw.eq_ignore_ascii_case("as") => Self {
                name: (*name).to_string(),
                alias: Some((*alias).to_string()),
            },
            [name, alias] => Self {
                name: (*name).to_string(),
                alias: Some((*alias).to_string()),
            },
            _ => Self {
                name: raw.as_ref().trim().to_string(),
                alias: None,
            },
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// The name other clauses use to reference this table.
    pub fn alias_or_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// `[TestTable]` or `[TestTable] [t1]`.
    pub fn to_sql(&self, dialect: Dialect, with_alias: bool) -> String {
        let name = dialect.quote(&self.name);
        match &self.alias {
            Some(alias) if with_alias => format!("{name} {}", dialect.quote_part(alias)),
            _ => name,
        }
    }
}

impl From<&str> for TableName {
    fn from(raw: &str) -> Self {
        TableName::new(raw)
    }
}

impl From<String> for TableName {
    fn from(raw: String) -> Self {
        TableName::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    pub fn sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinInfo {
    pub kind: JoinKind,
    pub table: TableName,
    pub on: ConditionGroup,
}

/// Read-only view of a query handed to grammars and method callers.
pub trait QueryInfoView {
    fn config(&self) -> &QueryConfig;
    fn table(&self) -> &TableName;
    fn has_joins(&self) -> bool;

    fn dialect(&self) -> Dialect {
        self.config().dialect
    }
}

/// Mutable query state. Owned by a [`Query`] and consumed by a grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryInfo {
    pub config: QueryConfig,
    pub table: TableName,
    /// Empty means `*`.
    pub columns: Vec<Column>,
    pub distinct: bool,
    pub joins: Vec<JoinInfo>,
    pub where_clause: ConditionGroup,
    pub group_by: Vec<Column>,
    pub having: ConditionGroup,
    pub order_by: Vec<ColumnOrder>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryInfo {
    pub fn new(table: impl Into<TableName>, config: QueryConfig) -> Self {
        Self {
            config,
            table: table.into(),
            columns: Vec::new(),
            distinct: false,
            joins: Vec::new(),
            where_clause: ConditionGroup::new(),
            group_by: Vec::new(),
            having: ConditionGroup::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// True when the select list is `*`.
    pub fn selects_all(&self) -> bool {
        self.columns.is_empty() || self.columns.iter().all(Column::is_all)
    }
}

impl QueryInfoView for QueryInfo {
    fn config(&self) -> &QueryConfig {
        &self.config
    }

    fn table(&self) -> &TableName {
        &self.table
    }

    fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }
}

/// Fluent query construction over a [`QueryInfo`].
///
/// ```ignore
/// let sql = Query::new("Orders o", QueryConfig::mysql())
///     .inner_join("Customers c", "c.Id", "=", "o.CustomerId")
///     .filter(Condition::eq("c.Name", "ACME"))
///     .order_by_desc("o.Id")
///     .limit(10)
///     .to_select()?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    info: QueryInfo,
}

impl Query {
    pub fn new(table: impl Into<TableName>, config: QueryConfig) -> Self {
        Self {
            info: QueryInfo::new(table, config),
        }
    }

    pub fn info(&self) -> &QueryInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut QueryInfo {
        &mut self.info
    }

    pub fn into_info(self) -> QueryInfo {
        self.info
    }

    // ==================== SELECT list ====================

    /// Replace the select list.
    pub fn select<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.info.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn add_select(mut self, column: impl Into<Column>) -> Self {
        self.info.columns.push(column.into());
        self
    }

    /// Select the members of an expression (`x => new { x.Id, x.Name.to_lowercase() }`).
    pub fn select_members(mut self, expr: &MemberExpr) -> OrmResult<Self> {
        let config = ExpressionConfig::ALL;
        let members = ExpressionProcessor::new(&self.info.config, config).process(expr)?;
        self.info.columns = members.into_iter().map(Column::Member).collect();
        Ok(self)
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.info.distinct = distinct;
        self
    }

    // ==================== WHERE ====================

    /// Add a WHERE condition joined with AND.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.info.where_clause.and(condition);
        self
    }

    /// Add a WHERE condition joined with OR.
    pub fn or_filter(mut self, condition: Condition) -> Self {
        self.info.where_clause.or(condition);
        self
    }

    /// `WHERE column = value`
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Condition::eq(column, value))
    }

    /// Compare a member chain with a value (`x.Name.to_lowercase() = 'a'`).
    pub fn where_member(
        self,
        expr: &MemberExpr,
        op: &'static str,
        value: impl Into<Value>,
    ) -> OrmResult<Self> {
        let member =
            ExpressionProcessor::new(&self.info.config, ExpressionConfig::default()).single(expr)?;
        Ok(self.filter(Condition::compare(member, op, value)))
    }

    // ==================== JOIN ====================

    pub fn join(mut self, kind: JoinKind, table: impl Into<TableName>, on: Condition) -> Self {
        let mut group = ConditionGroup::new();
        group.and(on);
        self.info.joins.push(JoinInfo {
            kind,
            table: table.into(),
            on: group,
        });
        self
    }

    pub fn inner_join(
        self,
        table: impl Into<TableName>,
        left: &str,
        op: &'static str,
        right: &str,
    ) -> Self {
        self.join(JoinKind::Inner, table, Condition::columns(left, op, right))
    }

    pub fn left_join(
        self,
        table: impl Into<TableName>,
        left: &str,
        op: &'static str,
        right: &str,
    ) -> Self {
        self.join(JoinKind::Left, table, Condition::columns(left, op, right))
    }

    // ==================== GROUP BY / HAVING / ORDER BY ====================

    pub fn group_by<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.info.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.info.having.and(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<Column>) -> Self {
        self.info.order_by.push(ColumnOrder::asc(column));
        self
    }

    pub fn order_by_desc(mut self, column: impl Into<Column>) -> Self {
        self.info.order_by.push(ColumnOrder::desc(column));
        self
    }

    // ==================== Pagination ====================

    pub fn limit(mut self, limit: u64) -> Self {
        self.info.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.info.offset = Some(offset);
        self
    }

    // ==================== Build ====================

    /// Grammar for the configured dialect, borrowing this query.
    pub fn grammar(&self) -> Box<dyn Grammar + '_> {
        grammar::for_query(&self.info)
    }

    pub fn to_select(&self) -> OrmResult<SqlExpression> {
        self.grammar().select()
    }

    pub fn to_count(&self) -> OrmResult<SqlExpression> {
        self.grammar().count(None)
    }

    pub fn to_delete(&self) -> OrmResult<SqlExpression> {
        self.grammar().delete()
    }
}

impl QueryInfoView for Query {
    fn config(&self) -> &QueryConfig {
        &self.info.config
    }

    fn table(&self) -> &TableName {
        &self.info.table
    }

    fn has_joins(&self) -> bool {
        self.info.has_joins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_alias_parsing() {
        let t = TableName::new("TestTable t1");
        assert_eq!(t.name(), "TestTable");
        assert_eq!(t.alias(), Some("t1"));
        let t = TableName::new("TestTable AS t1");
        assert_eq!(t.alias_or_name(), "t1");
        let t = TableName::new("dbo.TestTable");
        assert_eq!(t.alias(), None);
        assert_eq!(t.to_sql(Dialect::SqlServer, true), "[dbo].[TestTable]");
    }

    #[test]
    fn alias_rendering() {
        let t = TableName::new("TestTable").with_alias("t1");
        assert_eq!(t.to_sql(Dialect::Mysql, true), "`TestTable` `t1`");
        assert_eq!(t.to_sql(Dialect::Mysql, false), "`TestTable`");
    }

    #[test]
    fn fluent_builder_fills_info() {
        let q = Query::new("T", QueryConfig::sqlite())
            .select(["Id", "Name"])
            .where_eq("Id", 1)
            .or_filter(Condition::is_null("Name"))
            .order_by("Id")
            .limit(3)
            .offset(6);
        let info = q.info();
        assert_eq!(info.columns.len(), 2);
        assert_eq!(info.where_clause.len(), 2);
        assert_eq!(info.limit, Some(3));
        assert_eq!(info.offset, Some(6));
        assert!(!info.selects_all());
    }
}
