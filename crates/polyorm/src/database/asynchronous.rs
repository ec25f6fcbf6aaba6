use super::{count_of, ForeignCache, Pipeline, Statement};
use crate::client::{AsyncExecutor, CancelToken};
use crate::config::QueryConfig;
use crate::ddl::{TableGrammar, TableSchema};
use crate::error::{OrmError, OrmResult};
use crate::expression::SqlExpression;
use crate::grammar::Upsert;
use crate::mapping::{
    Entity, FkQueue, ForeignInfo, ForeignRequest, MappedObject, RowReader, TableInfo,
};
use crate::monitor::{QueryHook, QueryResult, QueryType};
use crate::query::{Query, TableName};
use crate::row::Row;
use crate::value::Value;
use std::sync::Arc;

/// Asynchronous facade over an [`AsyncExecutor`].
///
/// Generation is the same synchronous code path as [`Database`](super::Database);
/// only execution is awaited. Each call takes a [`CancelToken`] that is passed
/// to the executor unchanged.
pub struct AsyncDatabase<E> {
    config: QueryConfig,
    executor: E,
    pipeline: Pipeline,
}

/// Serves foreign rows fetched ahead of resolution.
struct Prefetched(ForeignCache);

impl FkQueue for Prefetched {
    fn load(&mut self, request: &ForeignRequest<'_>) -> OrmResult<Vec<Row>> {
        Ok(self.0.get(request).cloned().unwrap_or_default())
    }
}

impl<E: AsyncExecutor> AsyncDatabase<E> {
    pub fn new(config: QueryConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            pipeline: Pipeline::default(),
        }
    }

    pub fn with_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.pipeline.hooks.push(Arc::new(hook));
        self
    }

    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.pipeline.hooks.push(hook);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.pipeline.tag = Some(tag.into());
        self
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn query(&self, table: impl Into<TableName>) -> Query {
        Query::new(table, self.config.clone())
    }

    pub fn table_grammar(&self) -> TableGrammar<'_> {
        TableGrammar::new(&self.config)
    }

    // ==================== Execution ====================

    fn prepare(&self, expr: &SqlExpression, query_type: Option<QueryType>) -> OrmResult<Statement> {
        self.pipeline.prepare(&self.config, expr, query_type)
    }

    async fn run_execute(
        &mut self,
        expr: &SqlExpression,
        query_type: Option<QueryType>,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let statement = self.prepare(expr, query_type)?;
        let result = self
            .executor
            .execute(&statement.ctx.sql, &statement.params, cancel)
            .await;
        self.pipeline
            .finish(&statement, &result, |n| QueryResult::Affected(*n));
        result
    }

    async fn run_query(&mut self, expr: &SqlExpression, cancel: &CancelToken) -> OrmResult<Vec<Row>> {
        let statement = self.prepare(expr, Some(QueryType::Select))?;
        let result = self
            .executor
            .query(&statement.ctx.sql, &statement.params, cancel)
            .await
            .and_then(|reader| RowReader::new(reader).read_all());
        self.pipeline
            .finish(&statement, &result, |rows| QueryResult::Rows(rows.len()));
        result
    }

    async fn run_scalar(
        &mut self,
        expr: &SqlExpression,
        query_type: Option<QueryType>,
        cancel: &CancelToken,
    ) -> OrmResult<Value> {
        let statement = self.prepare(expr, query_type)?;
        let result = self
            .executor
            .scalar(&statement.ctx.sql, &statement.params, cancel)
            .await;
        self.pipeline.finish(&statement, &result, |_| QueryResult::Scalar);
        result
    }

    pub async fn execute_expression(
        &mut self,
        expr: &SqlExpression,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        self.run_execute(expr, None, cancel).await
    }

    pub async fn query_expression(
        &mut self,
        expr: &SqlExpression,
        cancel: &CancelToken,
    ) -> OrmResult<Vec<Row>> {
        self.run_query(expr, cancel).await
    }

    pub async fn scalar_expression(
        &mut self,
        expr: &SqlExpression,
        cancel: &CancelToken,
    ) -> OrmResult<Value> {
        self.run_scalar(expr, None, cancel).await
    }

    // ==================== Reads ====================

    pub async fn select_rows(&mut self, query: &Query, cancel: &CancelToken) -> OrmResult<Vec<Row>> {
        let expr = query.to_select()?;
        self.run_query(&expr, cancel).await
    }

    /// Map the rows of `query` onto `T`.
    ///
    /// With [`QueryConfig::load_foreign`] set, the rows of every distinct
    /// foreign key are fetched first and then attached.
    pub async fn select<T: Entity>(&mut self, query: &Query, cancel: &CancelToken) -> OrmResult<Vec<T>> {
        let rows = self.select_rows(query, cancel).await?;
        let mut mapped = MappedObject::<T>::new();
        let mut entities = Vec::with_capacity(rows.len());
        let mut pending = Vec::new();
        for row in &rows {
            let (entity, foreign) = mapped.read(row)?;
            let owner = entities.len();
            pending.extend(foreign.into_iter().map(|info| ForeignInfo { owner, ..info }));
            entities.push(entity);
        }

        if self.config.load_foreign && !pending.is_empty() {
            let mut cache = ForeignCache::default();
            for info in &pending {
                let Some(member) = mapped.info().foreign().get(info.member) else {
                    continue;
                };
                let (table, column) = member.target();
                if column.is_empty() {
                    return Err(OrmError::validation(format!(
                        "foreign member {} targets table {table} without a key column",
                        member.member()
                    )));
                }
                let request = ForeignRequest {
                    table: &table,
                    column: &column,
                    key: &info.key,
                    kind: member.kind(),
                };
                if cache.get(&request).is_none() {
                    let query = ForeignCache::query(&self.config, &request);
                    let rows = self.select_rows(&query, cancel).await?;
                    cache.insert(&request, rows);
                }
            }
            mapped.resolve(&mut entities, pending, &mut Prefetched(cache))?;
        }
        Ok(entities)
    }

    pub async fn select_all<T: Entity>(&mut self, cancel: &CancelToken) -> OrmResult<Vec<T>> {
        let query = self.query(TableInfo::<T>::of().table());
        self.select(&query, cancel).await
    }

    pub async fn count(&mut self, query: &Query, cancel: &CancelToken) -> OrmResult<u64> {
        let expr = query.to_count()?;
        count_of(self.run_scalar(&expr, Some(QueryType::Select), cancel).await?)
    }

    // ==================== Writes ====================

    pub async fn insert(
        &mut self,
        table: impl Into<TableName>,
        row: &Row,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let expr = self.query(table).grammar().insert(row)?;
        self.run_execute(&expr, Some(QueryType::Insert), cancel).await
    }

    pub async fn insert_get_id(
        &mut self,
        table: impl Into<TableName>,
        row: &Row,
        key: &str,
        cancel: &CancelToken,
    ) -> OrmResult<Value> {
        let expr = self.query(table).grammar().insert_get_id(row, key)?;
        self.run_scalar(&expr, Some(QueryType::Insert), cancel).await
    }

    /// Insert an entity. A generated key is read back into the entity.
    pub async fn insert_entity<T: Entity>(
        &mut self,
        entity: &mut T,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let row = info.insert_row_of(entity);
        match info.columns().iter().find(|c| c.is_generated()) {
            Some(column) => {
                let id = self
                    .insert_get_id(info.table(), &row, column.name(), cancel)
                    .await?;
                if !id.is_null() {
                    column.assign(entity, id)?;
                }
                Ok(1)
            }
            None => self.insert(info.table(), &row, cancel).await,
        }
    }

    pub async fn insert_from(
        &mut self,
        table: impl Into<TableName>,
        select: &Query,
        columns: &[String],
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let expr = self
            .query(table)
            .grammar()
            .insert_query(select.info(), columns)?;
        self.run_execute(&expr, Some(QueryType::Insert), cancel).await
    }

    pub async fn bulk_insert(
        &mut self,
        table: impl Into<TableName>,
        rows: &[Row],
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let batches = self.query(table).grammar().bulk_insert(rows)?;
        let mut affected = 0;
        for batch in &batches {
            affected += self
                .run_execute(batch, Some(QueryType::Insert), cancel)
                .await?;
        }
        Ok(affected)
    }

    pub async fn update(&mut self, query: &Query, row: &Row, cancel: &CancelToken) -> OrmResult<u64> {
        let expr = query.grammar().update(row.cells())?;
        self.run_execute(&expr, Some(QueryType::Update), cancel).await
    }

    pub async fn update_entity<T: Entity>(
        &mut self,
        entity: &T,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let query = self.keyed_query(&info, entity)?;
        self.update(&query, &info.update_row_of(entity), cancel).await
    }

    pub async fn delete(&mut self, query: &Query, cancel: &CancelToken) -> OrmResult<u64> {
        let expr = query.to_delete()?;
        self.run_execute(&expr, Some(QueryType::Delete), cancel).await
    }

    pub async fn delete_entity<T: Entity>(
        &mut self,
        entity: &T,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let query = self.keyed_query(&info, entity)?;
        self.delete(&query, cancel).await
    }

    pub async fn upsert(
        &mut self,
        table: impl Into<TableName>,
        row: &Row,
        upsert: &Upsert,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let expr = self.query(table).grammar().upsert(row, upsert)?;
        self.run_execute(&expr, Some(QueryType::Upsert), cancel).await
    }

    pub async fn upsert_rows(
        &mut self,
        table: impl Into<TableName>,
        rows: &[Row],
        upsert: &Upsert,
        cancel: &CancelToken,
    ) -> OrmResult<u64> {
        let expr = self.query(table).grammar().upsert_rows(rows, upsert)?;
        self.run_execute(&expr, Some(QueryType::Upsert), cancel).await
    }

    fn keyed_query<T: Entity>(&self, info: &TableInfo<T>, entity: &T) -> OrmResult<Query> {
        let mut query = self.query(info.table());
        for (column, value) in info.key_values(entity)? {
            query = query.where_eq(&column, value);
        }
        Ok(query)
    }

    // ==================== Schema ====================

    pub async fn create_table(&mut self, schema: &TableSchema, cancel: &CancelToken) -> OrmResult<u64> {
        let expr = self.table_grammar().create(schema)?;
        self.run_execute(&expr, Some(QueryType::Ddl), cancel).await
    }

    pub async fn table_exists(&mut self, name: &str, cancel: &CancelToken) -> OrmResult<bool> {
        let expr = self.table_grammar().exists(name)?;
        let found = self.run_scalar(&expr, Some(QueryType::Select), cancel).await?;
        Ok(count_of(found)? > 0)
    }

    // ==================== Transactions ====================

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    pub async fn transaction<R>(
        &mut self,
        cancel: &CancelToken,
        f: impl AsyncFnOnce(&mut Self) -> OrmResult<R>,
    ) -> OrmResult<R> {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "polyorm.sql", "BEGIN");
        self.executor.begin(cancel).await?;
        match f(self).await {
            Ok(value) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "polyorm.sql", "COMMIT");
                self.executor.commit(cancel).await?;
                Ok(value)
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "polyorm.sql", "ROLLBACK");
                if let Err(_rollback) = self.executor.rollback(cancel).await {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(target: "polyorm.sql", error = %_rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
