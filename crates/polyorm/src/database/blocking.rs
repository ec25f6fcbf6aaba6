use super::{count_of, ForeignCache, Pipeline, Statement};
use crate::client::Executor;
use crate::config::QueryConfig;
use crate::ddl::{TableGrammar, TableSchema};
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::grammar::Upsert;
use crate::mapping::{Entity, FkQueue, ForeignInfo, ForeignRequest, MappedObject, RowReader, TableInfo};
use crate::monitor::{QueryHook, QueryResult, QueryType};
use crate::query::{Query, TableName};
use crate::row::Row;
use crate::value::Value;
use std::sync::Arc;

/// Synchronous facade over an [`Executor`].
pub struct Database<E> {
    config: QueryConfig,
    executor: E,
    pipeline: Pipeline,
}

impl<E: Executor> Database<E> {
    pub fn new(config: QueryConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            pipeline: Pipeline::default(),
        }
    }

    /// Register a hook; hooks run in registration order.
    pub fn with_hook<H: QueryHook + 'static>(mut self, hook: H) -> Self {
        self.pipeline.hooks.push(Arc::new(hook));
        self
    }

    pub fn with_hook_arc(mut self, hook: Arc<dyn QueryHook>) -> Self {
        self.pipeline.hooks.push(hook);
        self
    }

    /// Tag attached to every [`QueryContext`](crate::monitor::QueryContext).
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

    /// A query on `table` using this database's configuration.
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

    fn run_execute(&mut self, expr: &SqlExpression, query_type: Option<QueryType>) -> OrmResult<u64> {
        let statement = self.prepare(expr, query_type)?;
        let result = self.executor.execute(&statement.ctx.sql, &statement.params);
        self.pipeline
            .finish(&statement, &result, |n| QueryResult::Affected(*n));
        result
    }

    fn run_query(&mut self, expr: &SqlExpression) -> OrmResult<Vec<Row>> {
        let statement = self.prepare(expr, Some(QueryType::Select))?;
        let result = self
            .executor
            .query(&statement.ctx.sql, &statement.params)
            .and_then(|reader| RowReader::new(reader).read_all());
        self.pipeline
            .finish(&statement, &result, |rows| QueryResult::Rows(rows.len()));
        result
    }

    fn run_scalar(&mut self, expr: &SqlExpression, query_type: Option<QueryType>) -> OrmResult<Value> {
        let statement = self.prepare(expr, query_type)?;
        let result = self.executor.scalar(&statement.ctx.sql, &statement.params);
        self.pipeline.finish(&statement, &result, |_| QueryResult::Scalar);
        result
    }

    /// Run any statement as a command.
    pub fn execute_expression(&mut self, expr: &SqlExpression) -> OrmResult<u64> {
        self.run_execute(expr, None)
    }

    /// Run any statement as a query.
    pub fn query_expression(&mut self, expr: &SqlExpression) -> OrmResult<Vec<Row>> {
        self.run_query(expr)
    }

    pub fn scalar_expression(&mut self, expr: &SqlExpression) -> OrmResult<Value> {
        self.run_scalar(expr, None)
    }

    // ==================== Reads ====================

    pub fn select_rows(&mut self, query: &Query) -> OrmResult<Vec<Row>> {
        let expr = query.to_select()?;
        self.run_query(&expr)
    }

    /// Map the rows of `query` onto `T`. Foreign members are loaded when
    /// [`QueryConfig::load_foreign`] is set.
    pub fn select<T: Entity>(&mut self, query: &Query) -> OrmResult<Vec<T>> {
        let rows = self.select_rows(query)?;
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
            let mut queue = ExecutorFkQueue::new(self);
            mapped.resolve(&mut entities, pending, &mut queue)?;
        }
        Ok(entities)
    }

    /// Every row of `T`'s table.
    pub fn select_all<T: Entity>(&mut self) -> OrmResult<Vec<T>> {
        let query = self.query(TableInfo::<T>::of().table());
        self.select(&query)
    }

    pub fn count(&mut self, query: &Query) -> OrmResult<u64> {
        let expr = query.to_count()?;
        count_of(self.run_scalar(&expr, Some(QueryType::Select))?)
    }

    // ==================== Writes ====================

    pub fn insert(&mut self, table: impl Into<TableName>, row: &Row) -> OrmResult<u64> {
        let query = self.query(table);
        let expr = query.grammar().insert(row)?;
        self.run_execute(&expr, Some(QueryType::Insert))
    }

    /// Insert and return the generated value of `key`.
    pub fn insert_get_id(
        &mut self,
        table: impl Into<TableName>,
        row: &Row,
        key: &str,
    ) -> OrmResult<Value> {
        let query = self.query(table);
        let expr = query.grammar().insert_get_id(row, key)?;
        self.run_scalar(&expr, Some(QueryType::Insert))
    }

    /// Insert an entity. A generated key is read back into the entity.
    pub fn insert_entity<T: Entity>(&mut self, entity: &mut T) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let row = info.insert_row_of(entity);
        match info.columns().iter().find(|c| c.is_generated()) {
            Some(column) => {
                let id = self.insert_get_id(info.table(), &row, column.name())?;
                if !id.is_null() {
                    column.assign(entity, id)?;
                }
                Ok(1)
            }
            None => self.insert(info.table(), &row),
        }
    }

    /// `INSERT INTO table (columns) SELECT ...`
    pub fn insert_from(
        &mut self,
        table: impl Into<TableName>,
        select: &Query,
        columns: &[String],
    ) -> OrmResult<u64> {
        let query = self.query(table);
        let expr = query.grammar().insert_query(select.info(), columns)?;
        self.run_execute(&expr, Some(QueryType::Insert))
    }

    /// Insert `rows` in as many batches as the dialect requires.
    pub fn bulk_insert(&mut self, table: impl Into<TableName>, rows: &[Row]) -> OrmResult<u64> {
        let query = self.query(table);
        let batches = query.grammar().bulk_insert(rows)?;
        let mut affected = 0;
        for batch in &batches {
            affected += self.run_execute(batch, Some(QueryType::Insert))?;
        }
        Ok(affected)
    }

    pub fn bulk_insert_entities<T: Entity>(&mut self, entities: &[T]) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let rows: Vec<Row> = entities.iter().map(|e| info.insert_row_of(e)).collect();
        self.bulk_insert(info.table(), &rows)
    }

    /// Update the rows matched by `query`.
    pub fn update(&mut self, query: &Query, row: &Row) -> OrmResult<u64> {
        let expr = query.grammar().update(row.cells())?;
        self.run_execute(&expr, Some(QueryType::Update))
    }

    /// Update an entity by its key columns.
    pub fn update_entity<T: Entity>(&mut self, entity: &T) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let query = self.keyed_query(&info, entity)?;
        self.update(&query, &info.update_row_of(entity))
    }

    pub fn delete(&mut self, query: &Query) -> OrmResult<u64> {
        let expr = query.to_delete()?;
        self.run_execute(&expr, Some(QueryType::Delete))
    }

    /// Delete from the query's table and every joined table.
    pub fn delete_including_joins(&mut self, query: &Query) -> OrmResult<u64> {
        let expr = query.grammar().delete_including_joins()?;
        self.run_execute(&expr, Some(QueryType::Delete))
    }

    /// Delete an entity by its key columns.
    pub fn delete_entity<T: Entity>(&mut self, entity: &T) -> OrmResult<u64> {
        let info = TableInfo::<T>::of();
        let query = self.keyed_query(&info, entity)?;
        self.delete(&query)
    }

    pub fn upsert(
        &mut self,
        table: impl Into<TableName>,
        row: &Row,
        upsert: &Upsert,
    ) -> OrmResult<u64> {
        self.upsert_rows(table, std::slice::from_ref(row), upsert)
    }

    pub fn upsert_rows(
        &mut self,
        table: impl Into<TableName>,
        rows: &[Row],
        upsert: &Upsert,
    ) -> OrmResult<u64> {
        let query = self.query(table);
        let expr = query.grammar().upsert_rows(rows, upsert)?;
        self.run_execute(&expr, Some(QueryType::Upsert))
    }

    fn keyed_query<T: Entity>(&self, info: &TableInfo<T>, entity: &T) -> OrmResult<Query> {
        let mut query = self.query(info.table());
        for (column, value) in info.key_values(entity)? {
            query = query.where_eq(&column, value);
        }
        Ok(query)
    }

    // ==================== Schema ====================

    pub fn create_table(&mut self, schema: &TableSchema) -> OrmResult<u64> {
        let expr = self.table_grammar().create(schema)?;
        self.run_execute(&expr, Some(QueryType::Ddl))
    }

    pub fn drop_table(&mut self, name: &str) -> OrmResult<u64> {
        let expr = self.table_grammar().drop(name)?;
        self.run_execute(&expr, Some(QueryType::Ddl))
    }

    pub fn table_exists(&mut self, name: &str) -> OrmResult<bool> {
        let expr = self.table_grammar().exists(name)?;
        Ok(count_of(self.run_scalar(&expr, Some(QueryType::Select))?)? > 0)
    }

    // ==================== Transactions ====================

    pub fn begin(&mut self) -> OrmResult<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "polyorm.sql", "BEGIN");
        self.executor.begin()
    }

    pub fn commit(&mut self) -> OrmResult<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "polyorm.sql", "COMMIT");
        self.executor.commit()
    }

    pub fn rollback(&mut self) -> OrmResult<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(target: "polyorm.sql", "ROLLBACK");
        self.executor.rollback()
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// The error of `f` is returned even when the rollback fails.
    pub fn transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> OrmResult<R>) -> OrmResult<R> {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(_rollback) = self.rollback() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(target: "polyorm.sql", error = %_rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Loads foreign members through a [`Database`], one keyed `SELECT` per
/// distinct `(table, column, key)`.
pub struct ExecutorFkQueue<'a, E> {
    db: &'a mut Database<E>,
    cache: ForeignCache,
}

impl<'a, E: Executor> ExecutorFkQueue<'a, E> {
    pub fn new(db: &'a mut Database<E>) -> Self {
        Self {
            db,
            cache: ForeignCache::default(),
        }
    }
}

impl<E: Executor> FkQueue for ExecutorFkQueue<'_, E> {
    fn load(&mut self, request: &ForeignRequest<'_>) -> OrmResult<Vec<Row>> {
        if let Some(rows) = self.cache.get(request) {
            return Ok(rows.clone());
        }
        let query = ForeignCache::query(&self.db.config, request);
        let rows = self.db.select_rows(&query)?;
        self.cache.insert(request, rows.clone());
        Ok(rows)
    }
}
