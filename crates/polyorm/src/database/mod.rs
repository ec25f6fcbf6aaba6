//! Execution facades.
//!
//! [`Database`] and [`AsyncDatabase`] put generation and execution together:
//! they build statements for their [`QueryConfig`], render them with `@pN`
//! placeholders, run every registered [`QueryHook`] and hand the statement to
//! the executor.
//!
//! ```ignore
//! let mut db = Database::new(QueryConfig::sql_server(), executor)
//!     .with_hook(TracingSqlHook::new());
//!
//! let query = db.query("Users").where_eq("Active", true).order_by("Name");
//! let users: Vec<User> = db.select(&query)?;
//!
//! db.transaction(|db| {
//!     db.insert_entity(&mut user)?;
//!     let sessions = db.query("Sessions").where_eq("UserId", user.id);
//!     db.delete(&sessions)
//! })?;
//! ```

mod asynchronous;
mod blocking;

pub use asynchronous::AsyncDatabase;
pub use blocking::{Database, ExecutorFkQueue};

use crate::config::QueryConfig;
use crate::error::{OrmError, OrmResult};
use crate::expression::{ParamStyle, SqlExpression};
use crate::mapping::{ForeignKind, ForeignRequest};
use crate::monitor::{HookAction, QueryContext, QueryHook, QueryResult, QueryType};
use crate::query::Query;
use crate::row::Row;
use crate::value::{FromValue, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A rendered statement that passed every hook.
#[derive(Debug)]
struct Statement {
    ctx: QueryContext,
    params: Vec<Value>,
    started: Instant,
}

/// Hooks and per-database settings shared by both facades.
#[derive(Clone, Default)]
struct Pipeline {
    hooks: Vec<Arc<dyn QueryHook>>,
    tag: Option<String>,
}

impl Pipeline {
    fn prepare(
        &self,
        config: &QueryConfig,
        expr: &SqlExpression,
        query_type: Option<QueryType>,
    ) -> OrmResult<Statement> {
        let rendered = expr.render(ParamStyle::At);
        let mut ctx = QueryContext::new(&rendered.sql, rendered.params.len(), config.dialect);
        if let Some(query_type) = query_type {
            ctx.query_type = query_type;
        }
        ctx.tag = self.tag.clone();

        for hook in &self.hooks {
            match hook.before_query(&ctx) {
                HookAction::Continue => {}
                HookAction::ModifySql(sql) => ctx.sql = sql,
                HookAction::Abort(reason) => {
                    return Err(OrmError::Other(format!("query aborted by hook: {reason}")));
                }
            }
        }

        Ok(Statement {
            ctx,
            params: rendered.params,
            started: Instant::now(),
        })
    }

    fn finish<T>(
        &self,
        statement: &Statement,
        result: &OrmResult<T>,
        outcome: impl FnOnce(&T) -> QueryResult,
    ) {
        if self.hooks.is_empty() {
            return;
        }
        let duration: Duration = statement.started.elapsed();
        let result = match result {
            Ok(value) => outcome(value),
            Err(err) => QueryResult::error(err.to_string()),
        };
        for hook in &self.hooks {
            hook.after_query(&statement.ctx, duration, &result);
        }
    }
}

fn count_of(value: Value) -> OrmResult<u64> {
    match value {
        Value::Null => Ok(0),
        value => u64::from_value(value).map_err(|e| OrmError::decode("count", e.to_string())),
    }
}

/// Rows already loaded for foreign members, keyed by table, column and key.
#[derive(Debug, Default)]
struct ForeignCache {
    rows: HashMap<(String, String, String), Vec<Row>>,
}

impl ForeignCache {
    fn key(request: &ForeignRequest<'_>) -> (String, String, String) {
        (
            request.table.to_string(),
            request.column.to_string(),
            request.key.key_text(),
        )
    }

    fn get(&self, request: &ForeignRequest<'_>) -> Option<&Vec<Row>> {
        self.rows.get(&Self::key(request))
    }

    fn insert(&mut self, request: &ForeignRequest<'_>, rows: Vec<Row>) {
        self.rows.insert(Self::key(request), rows);
    }

    /// The keyed SELECT loading one foreign member.
    fn query(config: &QueryConfig, request: &ForeignRequest<'_>) -> Query {
        let query = Query::new(request.table, config.clone())
            .where_eq(request.column, request.key.clone());
        match request.kind {
            ForeignKind::BelongsTo => query.limit(1),
            ForeignKind::HasMany => query,
        }
    }
}
