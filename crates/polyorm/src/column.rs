//! Selectable columns and ORDER BY items.

use crate::expression::SqlExpression;
use crate::member::SqlMember;
use crate::methods::SqlMethodRegistry;
use crate::error::OrmResult;
use crate::query::QueryInfoView;
use std::fmt;

/// Aggregate and scalar functions a column can be wrapped in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Coalesce,
}

impl AggregateFn {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
            AggregateFn::Coalesce => "COALESCE",
        }
    }

    /// `COALESCE` is a scalar function, the rest aggregate rows.
    pub fn is_aggregate(self) -> bool {
        !matches!(self, AggregateFn::Coalesce)
    }
}

/// A column in a SELECT list, GROUP BY or ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// `*`
    All,
    /// A plain (possibly dotted) column name.
    Name(String),
    /// `name AS alias`
    Aliased { name: String, alias: String },
    /// Raw SQL, optionally aliased.
    Raw {
        expr: SqlExpression,
        alias: Option<String>,
    },
    /// A compiled member chain (`x.Name.to_lowercase()`).
    Member(SqlMember),
    /// `FN([DISTINCT] args...)`. `COUNT` with no args renders `COUNT(*)`.
    Aggregate {
        func: AggregateFn,
        args: Vec<Column>,
        distinct: bool,
        alias: Option<String>,
    },
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == "*" {
            Column::All
        } else {
            Column::Name(name)
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Column::Aliased {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn raw(expr: SqlExpression) -> Self {
        Column::Raw { expr, alias: None }
    }

    pub fn count_all() -> Self {
        Column::Aggregate {
            func: AggregateFn::Count,
            args: Vec::new(),
            distinct: false,
            alias: None,
        }
    }

    pub fn count(column: impl Into<Column>) -> Self {
        Self::aggregate(AggregateFn::Count, column)
    }

    pub fn count_distinct(column: impl Into<Column>) -> Self {
        Column::Aggregate {
            func: AggregateFn::Count,
            args: vec![column.into()],
            distinct: true,
            alias: None,
        }
    }

    pub fn sum(column: impl Into<Column>) -> Self {
        Self::aggregate(AggregateFn::Sum, column)
    }

    pub fn avg(column: impl Into<Column>) -> Self {
        Self::aggregate(AggregateFn::Avg, column)
    }

    pub fn min(column: impl Into<Column>) -> Self {
        Self::aggregate(AggregateFn::Min, column)
    }

    pub fn max(column: impl Into<Column>) -> Self {
        Self::aggregate(AggregateFn::Max, column)
    }

    pub fn coalesce(columns: impl IntoIterator<Item = Column>) -> Self {
        Column::Aggregate {
            func: AggregateFn::Coalesce,
            args: columns.into_iter().collect(),
            distinct: false,
            alias: None,
        }
    }

    fn aggregate(func: AggregateFn, column: impl Into<Column>) -> Self {
        Column::Aggregate {
            func,
            args: vec![column.into()],
            distinct: false,
            alias: None,
        }
    }

    /// Set (or replace) the output alias.
    pub fn alias(self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        match self {
            Column::Name(name) | Column::Aliased { name, .. } => Column::Aliased { name, alias },
            Column::Raw { expr, .. } => Column::Raw {
                expr,
                alias: Some(alias),
            },
            Column::Aggregate {
                func,
                args,
                distinct,
                ..
            } => Column::Aggregate {
                func,
                args,
                distinct,
                alias: Some(alias),
            },
            Column::Member(mut member) => {
                member.alias = Some(alias);
                Column::Member(member)
            }
            Column::All => Column::All,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Column::All)
    }

    /// True for `COUNT/SUM/AVG/MIN/MAX` columns.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Column::Aggregate { func, .. } if func.is_aggregate())
    }

    /// Output alias, if any.
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Column::Aliased { alias, .. } => Some(alias),
            Column::Raw { alias, .. } | Column::Aggregate { alias, .. } => alias.as_deref(),
            Column::Member(member) => member.alias.as_deref(),
            _ => None,
        }
    }

    /// Render the column for `info`'s dialect.
    ///
    /// `with_alias` controls whether `AS alias` is emitted (SELECT lists yes,
    /// ORDER BY / GROUP BY no).
    pub fn to_expression(
        &self,
        info: &dyn QueryInfoView,
        with_alias: bool,
    ) -> OrmResult<SqlExpression> {
        let dialect = info.config().dialect;
        let body = match self {
            Column::All => SqlExpression::raw("*"),
            Column::Name(name) | Column::Aliased { name, .. } => {
                SqlExpression::raw(dialect.quote(name))
            }
            Column::Raw { expr, .. } => expr.clone(),
            Column::Member(member) => SqlMethodRegistry::shared(dialect).apply_member(
                info,
                member,
                info.has_joins(),
            )?,
            Column::Aggregate {
                func,
                args,
                distinct,
                ..
            } => {
                let inner = if args.is_empty() {
                    SqlExpression::raw("*")
                } else {
                    let parts = args
                        .iter()
                        .map(|c| c.to_expression(info, false))
                        .collect::<OrmResult<Vec<_>>>()?;
                    SqlExpression::join(parts, ", ")
                };
                let prefix = if *distinct {
                    format!("{}(DISTINCT ", func.sql_name())
                } else {
                    format!("{}(", func.sql_name())
                };
                inner.wrap(&prefix, ")")
            }
        };

        match self.alias_name() {
            Some(alias) if with_alias => {
                Ok(body.wrap("", &format!(" AS {}", dialect.quote_part(alias))))
            }
            _ => Ok(body),
        }
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

impl From<SqlExpression> for Column {
    fn from(expr: SqlExpression) -> Self {
        Column::raw(expr)
    }
}

impl From<SqlMember> for Column {
    fn from(member: SqlMember) -> Self {
        Column::Member(member)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderBy::Asc => "ASC",
            OrderBy::Desc => "DESC",
        })
    }
}

/// A column with a sort direction. Always rendered with an explicit direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnOrder {
    pub column: Column,
    pub order: OrderBy,
}

impl ColumnOrder {
    pub fn asc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            order: OrderBy::Asc,
        }
    }

    pub fn desc(column: impl Into<Column>) -> Self {
        Self {
            column: column.into(),
            order: OrderBy::Desc,
        }
    }

    pub fn to_expression(&self, info: &dyn QueryInfoView) -> OrmResult<SqlExpression> {
        let column = self.column.to_expression(info, false)?;
        Ok(column.wrap("", &format!(" {}", self.order)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use crate::query::QueryInfo;

    fn info() -> QueryInfo {
        QueryInfo::new("TestTable", QueryConfig::sql_server())
    }

    #[test]
    fn plain_and_aliased() {
        let info = info();
        assert_eq!(
            Column::new("t1.Name").to_expression(&info, true).unwrap().to_string(),
            "[t1].[Name]"
        );
        assert_eq!(
            Column::aliased("Name", "N").to_expression(&info, true).unwrap().to_string(),
            "[Name] AS [N]"
        );
        assert_eq!(
            Column::aliased("Name", "N").to_expression(&info, false).unwrap().to_string(),
            "[Name]"
        );
    }

    #[test]
    fn aggregates() {
        let info = info();
        assert_eq!(Column::count_all().to_expression(&info, true).unwrap().to_string(), "COUNT(*)");
        assert_eq!(
            Column::count_distinct("Name")
                .alias("total")
                .to_expression(&info, true)
                .unwrap()
                .to_string(),
            "COUNT(DISTINCT [Name]) AS [total]"
        );
        assert_eq!(
            Column::coalesce([Column::new("A"), Column::raw(SqlExpression::with_values("?", ["x"]))])
                .to_expression(&info, true)
                .unwrap()
                .to_string(),
            "COALESCE([A], ?)"
        );
        assert!(Column::max("Id").is_aggregate());
        assert!(!Column::coalesce([Column::new("A")]).is_aggregate());
    }

    #[test]
    fn order_is_explicit() {
        let info = info();
        assert_eq!(ColumnOrder::asc("Id").to_expression(&info).unwrap().to_string(), "[Id] ASC");
        assert_eq!(ColumnOrder::desc("Id").to_expression(&info).unwrap().to_string(), "[Id] DESC");
    }
}
