//! In-memory executors shared by the integration tests.

#![allow(dead_code)]

use polyorm::mapping::MemoryReader;
use polyorm::{AsyncExecutor, CancelToken, Executor, OrmError, OrmResult, Value};
use std::collections::VecDeque;

/// One statement as the executor received it.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Records statements and answers queries and scalars from queues.
#[derive(Debug, Default)]
pub struct MockExecutor {
    pub executed: Vec<Executed>,
    pub readers: VecDeque<MemoryReader>,
    pub scalars: VecDeque<Value>,
    pub transactions: Vec<&'static str>,
    /// Statements containing this text fail.
    pub fail_on: Option<String>,
    /// Set when a cancelled token reached the executor.
    pub saw_cancelled: bool,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reader(mut self, reader: MemoryReader) -> Self {
        self.readers.push_back(reader);
        self
    }

    pub fn with_scalar(mut self, value: impl Into<Value>) -> Self {
        self.scalars.push_back(value.into());
        self
    }

    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn sql(&self) -> Vec<&str> {
        self.executed.iter().map(|e| e.sql.as_str()).collect()
    }

    fn record(&mut self, sql: &str, params: &[Value]) -> OrmResult<()> {
        self.executed.push(Executed {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.fail_on {
            Some(needle) if sql.contains(needle.as_str()) => {
                Err(OrmError::execution(format!("rejected: {sql}")))
            }
            _ => Ok(()),
        }
    }

    fn observe(&mut self, cancel: &CancelToken) {
        self.saw_cancelled |= cancel.is_cancelled();
    }
}

impl Executor for MockExecutor {
    type Reader = MemoryReader;

    fn execute(&mut self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        self.record(sql, params)?;
        Ok(1)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> OrmResult<MemoryReader> {
        self.record(sql, params)?;
        Ok(self.readers.pop_front().unwrap_or_default())
    }

    fn scalar(&mut self, sql: &str, params: &[Value]) -> OrmResult<Value> {
        self.record(sql, params)?;
        Ok(self.scalars.pop_front().unwrap_or(Value::Null))
    }

    fn begin(&mut self) -> OrmResult<()> {
        self.transactions.push("begin");
        Ok(())
    }

    fn commit(&mut self) -> OrmResult<()> {
        self.transactions.push("commit");
        Ok(())
    }

    fn rollback(&mut self) -> OrmResult<()> {
        self.transactions.push("rollback");
        Ok(())
    }
}

impl AsyncExecutor for MockExecutor {
    type Reader = MemoryReader;

    async fn execute(&mut self, sql: &str, params: &[Value], cancel: &CancelToken) -> OrmResult<u64> {
        self.observe(cancel);
        Executor::execute(self, sql, params)
    }

    async fn query(
        &mut self,
        sql: &str,
        params: &[Value],
        cancel: &CancelToken,
    ) -> OrmResult<MemoryReader> {
        self.observe(cancel);
        Executor::query(self, sql, params)
    }

    async fn scalar(&mut self, sql: &str, params: &[Value], cancel: &CancelToken) -> OrmResult<Value> {
        self.observe(cancel);
        Executor::scalar(self, sql, params)
    }

    async fn begin(&mut self, cancel: &CancelToken) -> OrmResult<()> {
        self.observe(cancel);
        Executor::begin(self)
    }

    async fn commit(&mut self, cancel: &CancelToken) -> OrmResult<()> {
        self.observe(cancel);
        Executor::commit(self)
    }

    async fn rollback(&mut self, cancel: &CancelToken) -> OrmResult<()> {
        self.observe(cancel);
        Executor::rollback(self)
    }
}
