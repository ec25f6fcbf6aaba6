//! Convenient imports for typical `polyorm` usage.
//!
//! ```ignore
//! use polyorm::prelude::*;
//! ```

pub use crate::{
    Cell, Column, Condition, Database, Dialect, Entity, Executor, FromRow, FromValue, Grammar,
    OrmError, OrmResult, ParamStyle, Query, QueryConfig, Row, SqlExpression, TableInfo, Upsert,
    Value,
};

pub use crate::{AsyncDatabase, AsyncExecutor, CancelToken};
