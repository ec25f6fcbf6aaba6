//! # polyorm
//!
//! Multi-dialect SQL generation and object mapping for SqlServer, MySQL,
//! SQLite and Firebird.
//!
//! ## Features
//!
//! - **One query, four dialects**: a [`Query`] renders through the [`Grammar`] of
//!   its configured [`Dialect`]; shapes a dialect cannot express fail with
//!   [`OrmError::NotSupported`] instead of producing different SQL
//! - **Ordered parameters**: every statement is a [`SqlExpression`] whose values
//!   follow the textual order of their placeholders
//! - **Member translation**: string and date members (`name.to_lower()`,
//!   `created.year()`) become dialect functions through the [`SqlMethodRegistry`]
//! - **Schema statements**: tables, constraints and indexes via [`TableGrammar`]
//! - **Object mapping**: rows to entities (constructors, nested value objects,
//!   foreign members) via [`TableInfo`] and [`MappedObject`]
//! - **Bring your own driver**: [`Database`] / [`AsyncDatabase`] run statements on
//!   any [`Executor`] / [`AsyncExecutor`], with [`QueryHook`]s around each one
//!
//! ## Example
//!
//! ```ignore
//! use polyorm::prelude::*;
//!
//! let query = Query::new("Users", QueryConfig::mysql())
//!     .filter(Condition::eq("Active", true))
//!     .order_by("Name")
//!     .limit(10)
//!     .offset(20);
//!
//! let sql = query.to_select()?;
//! assert_eq!(
//!     sql.to_string(),
//!     "SELECT * FROM `Users` WHERE `Active` = 1 ORDER BY `Name` ASC LIMIT 10 OFFSET 20"
//! );
//!
//! let rendered = sql.render(ParamStyle::At);
//! executor.query(&rendered.sql, &rendered.params)?;
//! ```

pub mod builder;
pub mod client;
pub mod column;
pub mod condition;
pub mod config;
pub mod database;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod mapping;
pub mod member;
pub mod methods;
pub mod monitor;
pub mod prelude;
pub mod query;
pub mod row;
pub mod value;

pub use builder::QueryBuilder;
pub use client::{AsyncExecutor, CancelToken, Executor};
pub use column::{AggregateFn, Column, ColumnOrder, OrderBy};
pub use condition::{Condition, ConditionGroup, Operand};
pub use config::{Nomenclature, QueryConfig};
pub use database::{AsyncDatabase, Database, ExecutorFkQueue};
pub use ddl::{
    CheckConstraint, ColumnDef, Constraint, ForeignKey, Index, PrimaryKey, ReferentialAction,
    TableGrammar, TableSchema, UniqueConstraint,
};
pub use dialect::Dialect;
pub use error::{OrmError, OrmResult};
pub use expression::{ParamStyle, RenderedSql, SqlExpression, SqlParam};
pub use grammar::{Grammar, Upsert};
pub use mapping::{
    DataReader, Entity, FkQueue, FromRow, MappedObject, MemoryReader, RowReader, TableInfo,
};
pub use member::{ExpressionConfig, ExpressionProcessor, MemberExpr, SqlMember};
pub use methods::{SqlCaller, SqlMethodRegistry};
pub use monitor::{HookAction, QueryContext, QueryHook, QueryType};
pub use query::{JoinKind, Query, QueryInfo, TableName};
pub use row::{Cell, Row};
pub use value::{FromValue, Value};

#[cfg(feature = "tracing")]
pub use monitor::TracingSqlHook;
