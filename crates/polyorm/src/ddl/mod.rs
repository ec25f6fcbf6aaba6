//! Table DDL: schema descriptions, constraints, indexes and the per-dialect
//! [`TableGrammar`] that renders them.
//!
//! Constraint constructors validate their input immediately, so an invalid
//! definition never reaches a grammar.
//!
//! ```ignore
//! let schema = TableSchema::new("Users")
//!     .column(ColumnDef::new("Id", "INT").auto_increment().primary_key())
//!     .column(ColumnDef::new("Email", "VARCHAR(120)").not_null())
//!     .constraint(UniqueConstraint::new("Users", ["Email"])?);
//! let sql = TableGrammar::new(&QueryConfig::mysql()).create(&schema)?;
//! ```

mod table;

#[cfg(test)]
mod tests;

pub use table::TableGrammar;

use crate::error::{OrmError, OrmResult};
use crate::expression::{SqlExpression, SqlParam};
use crate::value::Value;

// ==================== Columns ====================

/// A column of a [`TableSchema`]. The physical type is written as given.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub default: Option<SqlParam>,
    pub auto_increment: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            default: None,
            auto_increment: false,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Default written as a literal.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(SqlParam::Value(value.into()));
        self
    }

    /// Default written as raw SQL (`CURRENT_TIMESTAMP`).
    pub fn default_sql(mut self, sql: impl Into<String>) -> Self {
        self.default = Some(SqlParam::Expression(SqlExpression::raw(sql)));
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }

    /// Part of the table's primary key when no explicit [`PrimaryKey`] is given.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

// ==================== Constraints ====================

fn require_table(table: &str) -> OrmResult<String> {
    let table = table.trim();
    if table.is_empty() {
        return Err(OrmError::validation("constraint table name cannot be empty"));
    }
    Ok(table.to_string())
}

fn require_columns<C: Into<String>>(columns: impl IntoIterator<Item = C>) -> OrmResult<Vec<String>> {
    let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
    if columns.is_empty() {
        return Err(OrmError::validation("constraint needs at least one column"));
    }
    if columns.iter().any(|c| c.trim().is_empty()) {
        return Err(OrmError::validation("constraint column names cannot be empty"));
    }
    Ok(columns)
}

/// Default constraint names use the table's last name part (`dbo.Users` -> `Users`).
fn default_name(prefix: &str, table: &str, columns: &[String]) -> String {
    let table = table.rsplit('.').next().unwrap_or(table);
    let mut name = format!("{prefix}_{table}");
    for column in columns {
        name.push('_');
        name.push_str(column);
    }
    name
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

impl PrimaryKey {
    /// Named `PK_<table>`.
    pub fn new<C: Into<String>>(
        table: impl AsRef<str>,
        columns: impl IntoIterator<Item = C>,
    ) -> OrmResult<Self> {
        let table = require_table(table.as_ref())?;
        let columns = require_columns(columns)?;
        Ok(Self {
            name: default_name("PK", &table, &[]),
            table,
            columns,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    /// Named `UC_<table>_<col1>_<col2>...`.
    pub fn new<C: Into<String>>(
        table: impl AsRef<str>,
        columns: impl IntoIterator<Item = C>,
    ) -> OrmResult<Self> {
        let table = require_table(table.as_ref())?;
        let columns = require_columns(columns)?;
        Ok(Self {
            name: default_name("UC", &table, &columns),
            table,
            columns,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// `ON DELETE` / `ON UPDATE` action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferentialAction {
    NoAction,
    Cascade,
    SetNull,
    SetDefault,
}

impl ReferentialAction {
    pub fn sql(self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub name: String,
    pub column: String,
    pub ref_table: String,
    pub ref_column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKey {
    /// Named `FK_<table>_<column>`.
    pub fn new(
        table: impl AsRef<str>,
        column: impl Into<String>,
        ref_table: impl AsRef<str>,
        ref_column: impl Into<String>,
    ) -> OrmResult<Self> {
        let table = require_table(table.as_ref())?;
        let ref_table = require_table(ref_table.as_ref())?;
        let (column, ref_column) = (column.into(), ref_column.into());
        require_columns([column.as_str(), ref_column.as_str()])?;
        Ok(Self {
            name: default_name("FK", &table, std::slice::from_ref(&column)),
            table,
            column,
            ref_table,
            ref_column,
            on_delete: None,
            on_update: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConstraint {
    pub table: String,
    pub name: String,
    /// Raw boolean SQL expression.
    pub expression: String,
}

impl CheckConstraint {
    /// Named `CK_<table>`.
    pub fn new(table: impl AsRef<str>, expression: impl Into<String>) -> OrmResult<Self> {
        let table = require_table(table.as_ref())?;
        let expression = expression.into();
        if expression.trim().is_empty() {
            return Err(OrmError::validation("check constraint expression cannot be empty"));
        }
        Ok(Self {
            name: default_name("CK", &table, &[]),
            table,
            expression,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey(PrimaryKey),
    Unique(UniqueConstraint),
    ForeignKey(ForeignKey),
    Check(CheckConstraint),
}

impl Constraint {
    pub fn table(&self) -> &str {
        match self {
            Constraint::PrimaryKey(c) => &c.table,
            Constraint::Unique(c) => &c.table,
            Constraint::ForeignKey(c) => &c.table,
            Constraint::Check(c) => &c.table,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Constraint::PrimaryKey(c) => &c.name,
            Constraint::Unique(c) => &c.name,
            Constraint::ForeignKey(c) => &c.name,
            Constraint::Check(c) => &c.name,
        }
    }
}

impl From<PrimaryKey> for Constraint {
    fn from(c: PrimaryKey) -> Self {
        Constraint::PrimaryKey(c)
    }
}

impl From<UniqueConstraint> for Constraint {
    fn from(c: UniqueConstraint) -> Self {
        Constraint::Unique(c)
    }
}

impl From<ForeignKey> for Constraint {
    fn from(c: ForeignKey) -> Self {
        Constraint::ForeignKey(c)
    }
}

impl From<CheckConstraint> for Constraint {
    fn from(c: CheckConstraint) -> Self {
        Constraint::Check(c)
    }
}

// ==================== Indexes ====================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    /// Named `IX_<table>_<col1>_<col2>...`.
    pub fn new<C: Into<String>>(
        table: impl AsRef<str>,
        columns: impl IntoIterator<Item = C>,
    ) -> OrmResult<Self> {
        let table = require_table(table.as_ref())?;
        let columns = require_columns(columns)?;
        Ok(Self {
            name: default_name("IX", &table, &columns),
            table,
            columns,
            unique: false,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ==================== Tables ====================

/// Everything `CREATE TABLE` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<Constraint>,
    pub temporary: bool,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            temporary: false,
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn constraint(mut self, constraint: impl Into<Constraint>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// The explicit primary key, or one built from the columns flagged `primary_key`.
    pub fn primary_key(&self) -> Option<PrimaryKey> {
        let explicit = self.constraints.iter().find_map(|c| match c {
            Constraint::PrimaryKey(pk) => Some(pk.clone()),
            _ => None,
        });
        if explicit.is_some() {
            return explicit;
        }
        let flagged = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone());
        PrimaryKey::new(&self.name, flagged).ok()
    }
}
