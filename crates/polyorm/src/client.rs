//! Command execution traits.
//!
//! polyorm only generates SQL; running it is left to an [`Executor`] (or
//! [`AsyncExecutor`]) supplied by the application. Statements arrive rendered
//! with `@p1, @p2, ...` placeholders and their values in the same order.

use crate::error::OrmResult;
use crate::mapping::DataReader;
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Synchronous command execution.
pub trait Executor {
    /// Forward-only cursor returned by [`query`](Self::query).
    type Reader: DataReader;

    /// Run a command and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64>;

    /// Run a query and return its rows.
    fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<Self::Reader>;

    /// First column of the first row; `Value::Null` when there is none.
    fn scalar(&mut self, sql: &str, params: &[Value]) -> OrmResult<Value>;

    fn begin(&mut self) -> OrmResult<()>;

    fn commit(&mut self) -> OrmResult<()>;

    fn rollback(&mut self) -> OrmResult<()>;
}

impl<E: Executor + ?Sized> Executor for &mut E {
    type Reader = E::Reader;

    fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<Self::Reader> {
        (**self).query(sql, params)
    }

    fn scalar(&mut self, sql: &str, params: &[Value]) -> OrmResult<Value> {
        (**self).scalar(sql, params)
    }

    fn begin(&mut self) -> OrmResult<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> OrmResult<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> OrmResult<()> {
        (**self).rollback()
    }
}

/// Asynchronous command execution.
///
/// Every operation receives the caller's [`CancelToken`]. polyorm never
/// inspects it; honouring cancellation is up to the executor.
pub trait AsyncExecutor: Send {
    type Reader: DataReader + Send;

    fn execute(
        &mut self,
        sql: &str,
        params: &[Value],
        cancel: &CancelToken,
    ) -> impl Future<Output = OrmResult<u64>> + Send;

    fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        cancel: &CancelToken,
    ) -> impl Future<Output = OrmResult<Self::Reader>> + Send;

    fn scalar(
        &mut self,
        sql: &str,
        params: &[Value],
        cancel: &CancelToken,
    ) -> impl Future<Output = OrmResult<Value>> + Send;

    fn begin(&mut self, cancel: &CancelToken) -> impl Future<Output = OrmResult<()>> + Send;

    fn commit(&mut self, cancel: &CancelToken) -> impl Future<Output = OrmResult<()>> + Send;

    fn rollback(&mut self, cancel: &CancelToken) -> impl Future<Output = OrmResult<()>> + Send;
}

/// Cooperative cancellation flag shared between a caller and an executor.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        assert!(!CancelToken::default().is_cancelled());
    }
}
