//! Translation of member chains into dialect SQL.
//!
//! [`SqlMethodRegistry`] holds an ordered list of [`SqlCaller`]s. For every node
//! of a [`SqlMember`] chain it picks the first caller whose [`SqlCaller::can_work`]
//! accepts the node and folds the node around the expression built so far, so
//! `x.Name.substring(0, 3).to_uppercase()` becomes `UPPER(SUBSTRING([Name],?,?))`.
//! Dialects register specific callers before generic ones.

pub mod date_format;
mod firebird;
mod mysql;
mod sqlite;
mod sqlserver;

#[cfg(test)]
mod tests;

pub use firebird::{FirebirdDateMethods, FirebirdDateProperties, FirebirdStringMethods};
pub use mysql::{MysqlDateMethods, MysqlDateProperties, MysqlStringMethods};
pub use sqlite::{SqliteDateMethods, SqliteDateProperties, SqliteStringMethods};
pub use sqlserver::{SqlServerDateMethods, SqlServerDateProperties, SqlServerStringMethods};

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expression::{SqlExpression, SqlParam};
use crate::member::{MemberKind, MemberType, SqlArg, SqlMember, SqlMemberInfo};
use crate::query::QueryInfoView;
use crate::value::Value;
use std::sync::OnceLock;

/// Translator for one family of members on one dialect.
pub trait SqlCaller: Send + Sync {
    /// Whether this caller translates `member`.
    fn can_work(&self, member: &SqlMemberInfo) -> bool;

    /// Wrap `current` with the SQL for `member`.
    ///
    /// `args` are the member's arguments, already compiled. Static roots
    /// receive an empty `current`.
    fn get_sql_expression(
        &self,
        info: &dyn QueryInfoView,
        current: SqlExpression,
        member: &SqlMemberInfo,
        args: Vec<SqlParam>,
    ) -> OrmResult<SqlExpression>;
}

/// Ordered caller list with first-registered-wins dispatch.
#[derive(Default)]
pub struct SqlMethodRegistry {
    callers: Vec<Box<dyn SqlCaller>>,
}

impl SqlMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in callers of a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        let mut registry = Self::new();
        match dialect {
            Dialect::SqlServer => registry
                .add(SqlServerStringMethods)
                .add(SqlServerDateProperties)
                .add(SqlServerDateMethods),
            Dialect::Mysql => registry
                .add(MysqlStringMethods)
                .add(MysqlDateProperties)
                .add(MysqlDateMethods),
            Dialect::Sqlite => registry
                .add(SqliteStringMethods)
                .add(SqliteDateProperties)
                .add(SqliteDateMethods),
            Dialect::Firebird => registry
                .add(FirebirdStringMethods)
                .add(FirebirdDateProperties)
                .add(FirebirdDateMethods),
        };
        registry
    }

    /// Process-wide built-in registry of a dialect.
    pub fn shared(dialect: Dialect) -> &'static SqlMethodRegistry {
        static SQL_SERVER: OnceLock<SqlMethodRegistry> = OnceLock::new();
        static MYSQL: OnceLock<SqlMethodRegistry> = OnceLock::new();
        static SQLITE: OnceLock<SqlMethodRegistry> = OnceLock::new();
        static FIREBIRD: OnceLock<SqlMethodRegistry> = OnceLock::new();

        let cell = match dialect {
            Dialect::SqlServer => &SQL_SERVER,
            Dialect::Mysql => &MYSQL,
            Dialect::Sqlite => &SQLITE,
            Dialect::Firebird => &FIREBIRD,
        };
        cell.get_or_init(|| Self::for_dialect(dialect))
    }

    /// Append a caller. Earlier callers take precedence.
    pub fn add(&mut self, caller: impl SqlCaller + 'static) -> &mut Self {
        self.callers.push(Box::new(caller));
        self
    }

    /// Insert a caller ahead of every registered one.
    pub fn add_first(&mut self, caller: impl SqlCaller + 'static) -> &mut Self {
        self.callers.insert(0, Box::new(caller));
        self
    }

    pub fn len(&self) -> usize {
        self.callers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }

    /// First caller accepting `member`.
    pub fn find(&self, member: &SqlMemberInfo) -> Option<&dyn SqlCaller> {
        self.callers
            .iter()
            .find(|c| c.can_work(member))
            .map(|c| c.as_ref())
    }

    /// Compile a member chain.
    ///
    /// `force_prefix` qualifies the root column with the table alias (used
    /// when the query has joins).
    pub fn apply_member(
        &self,
        info: &dyn QueryInfoView,
        member: &SqlMember,
        force_prefix: bool,
    ) -> OrmResult<SqlExpression> {
        if member.root.value_type.is_entity() && !member.is_static {
            return match member.promote_first_child(info.config()) {
                Some(real) => self.apply_member(info, &real, force_prefix),
                None => Err(OrmError::validation(format!(
                    "member `{}` is an object and has no column",
                    member.root.name
                ))),
            };
        }

        let mut current = if member.is_static {
            let root = SqlMemberInfo::Property(member.root.clone());
            self.apply_node(info, SqlExpression::default(), &root, force_prefix)?
        } else {
            let dialect = info.config().dialect;
            let column = if force_prefix {
                format!("{}.{}", info.table().alias_or_name(), member.column)
            } else {
                member.column.clone()
            };
            SqlExpression::raw(dialect.quote(&column))
        };

        for child in &member.children {
            current = self.apply_node(info, current, child, force_prefix)?;
        }
        Ok(current)
    }

    fn apply_node(
        &self,
        info: &dyn QueryInfoView,
        current: SqlExpression,
        node: &SqlMemberInfo,
        force_prefix: bool,
    ) -> OrmResult<SqlExpression> {
        let caller = self
            .find(node)
            .ok_or_else(|| OrmError::not_mapped(node.declaring_type().to_string(), node.name()))?;
        let args = node
            .args()
            .iter()
            .map(|arg| self.compile_arg(info, arg, force_prefix))
            .collect::<OrmResult<Vec<_>>>()?;
        caller.get_sql_expression(info, current, node, args)
    }

    fn compile_arg(
        &self,
        info: &dyn QueryInfoView,
        arg: &SqlArg,
        force_prefix: bool,
    ) -> OrmResult<SqlParam> {
        Ok(match arg {
            SqlArg::Value(v) => SqlParam::Value(v.clone()),
            SqlArg::Member(m) => SqlParam::Expression(self.apply_member(info, m, force_prefix)?),
            SqlArg::Expression(e) => SqlParam::Expression(e.clone()),
        })
    }
}

// ==================== Caller helpers ====================

pub(crate) const STRING_METHODS: &[&str] = &[
    "to_uppercase",
    "to_lowercase",
    "trim",
    "trim_start",
    "trim_end",
    "substring",
    "replace",
    "concat",
];
pub(crate) const STRING_PROPERTIES: &[&str] = &["len"];

/// Date properties. `now`, `utc_now` and `today` are static roots and get an
/// empty `current`.
pub(crate) const DATE_PROPERTIES: &[&str] = &[
    "now",
    "utc_now",
    "today",
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "second",
    "day_of_year",
    "day_of_week",
    "date",
    "time_of_day",
];
pub(crate) const DATE_METHODS: &[&str] = &[
    "to_string",
    "format",
    "add_days",
    "add_months",
    "add_years",
    "add_hours",
    "add_minutes",
    "add_seconds",
];

/// Matches a member by declaring type, kind and name.
pub(crate) fn member_is(
    member: &SqlMemberInfo,
    accepts: fn(&MemberType) -> bool,
    kind: MemberKind,
    names: &[&str],
) -> bool {
    member.kind() == kind && accepts(member.declaring_type()) && names.contains(&member.name())
}

pub(crate) fn is_string(ty: &MemberType) -> bool {
    matches!(ty, MemberType::String)
}

pub(crate) fn is_date(ty: &MemberType) -> bool {
    ty.is_date()
}

/// Placeholders for `n` values joined with `sep`.
pub(crate) fn placeholders(n: usize, sep: &str) -> String {
    vec!["?"; n].join(sep)
}

/// Argument `idx`, or a validation error naming the member.
pub(crate) fn arg(args: &[SqlParam], idx: usize, member: &SqlMemberInfo) -> OrmResult<SqlParam> {
    args.get(idx).cloned().ok_or_else(|| {
        OrmError::validation(format!(
            "{}.{} expects at least {} argument(s)",
            member.declaring_type(),
            member.name(),
            idx + 1
        ))
    })
}

/// Turn a 0-based position into a 1-based SQL position.
pub(crate) fn one_based(param: SqlParam) -> SqlParam {
    match param {
        SqlParam::Value(Value::Int(n)) => SqlParam::Value(Value::Int(n + 1)),
        other => SqlParam::Expression(SqlExpression::new("(? + 1)", vec![other])),
    }
}

/// Literal text argument (format strings), or a validation error.
pub(crate) fn text_arg(
    args: &[SqlParam],
    idx: usize,
    member: &SqlMemberInfo,
) -> OrmResult<String> {
    match arg(args, idx, member)? {
        SqlParam::Value(Value::Text(s)) => Ok(s),
        _ => Err(OrmError::validation(format!(
            "{}.{} expects a text constant",
            member.declaring_type(),
            member.name()
        ))),
    }
}

pub(crate) fn unsupported(member: &SqlMemberInfo, dialect: Dialect) -> OrmError {
    OrmError::not_supported(
        format!("{}.{}", member.declaring_type(), member.name()),
        dialect.name(),
    )
}

/// Error for a member a caller accepted but has no arm for.
pub(crate) fn unmapped(member: &SqlMemberInfo) -> OrmError {
    OrmError::not_mapped(member.declaring_type().to_string(), member.name())
}
