//! Statement hooks.
//!
//! A [`QueryHook`] sees every statement a `Database` sends to its executor:
//! `before_query` may rewrite or abort it, `after_query` receives the outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use polyorm::monitor::{HookAction, QueryContext, QueryHook, StatsHook, TracingSqlHook};
//!
//! struct ReadOnly;
//!
//! impl QueryHook for ReadOnly {
//!     fn before_query(&self, ctx: &QueryContext) -> HookAction {
//!         match ctx.query_type {
//!             QueryType::Select => HookAction::Continue,
//!             _ => HookAction::Abort("read-only connection".into()),
//!         }
//!     }
//! }
//!
//! let db = Database::new(config, executor)
//!     .with_hook(TracingSqlHook::new())
//!     .with_hook(ReadOnly);
//! ```

mod hooks;
mod types;

#[cfg(feature = "tracing")]
mod tracing_hook;

#[cfg(test)]
mod tests;

pub use hooks::{CompositeHook, QueryStats, StatsHook};
pub use types::{HookAction, QueryContext, QueryHook, QueryResult, QueryType};

#[cfg(feature = "tracing")]
pub use tracing_hook::TracingSqlHook;

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
