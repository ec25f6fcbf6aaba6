use super::Upsert;
use crate::builder::QueryBuilder;
use crate::column::Column;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expression::{SqlExpression, SqlParam};
use crate::query::{JoinKind, QueryInfo, TableName};
use crate::row::{Cell, Row};

/// Clause writers and checks shared by every dialect grammar.
#[derive(Debug, Clone, Copy)]
pub struct GrammarBase<'a> {
    info: &'a QueryInfo,
}

impl<'a> GrammarBase<'a> {
    pub fn new(info: &'a QueryInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &'a QueryInfo {
        self.info
    }

    pub fn dialect(&self) -> Dialect {
        self.info.config.dialect
    }

    /// A fresh builder following the query config.
    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(&self.info.config)
    }

    pub fn unsupported(&self, feature: impl Into<String>) -> OrmError {
        OrmError::not_supported(feature, self.dialect().name())
    }

    // ==================== Checks ====================

    /// Fail with `NotSupported` when `present`.
    pub fn reject(&self, present: bool, feature: &str, statement: &str) -> OrmResult<()> {
        if present {
            return Err(self.unsupported(format!("{feature} on {statement}")));
        }
        Ok(())
    }

    pub fn check_cells(&self, cells: &[Cell]) -> OrmResult<()> {
        if cells.is_empty() {
            return Err(OrmError::validation("no columns to insert or update"));
        }
        Ok(())
    }

    /// Refuse an unfiltered UPDATE/DELETE when safe modifications are on.
    pub fn check_safe(&self, statement: &str) -> OrmResult<()> {
        if self.info.config.only_safe_modifications && self.info.where_clause.is_empty() {
            return Err(OrmError::validation(format!(
                "{statement} without a WHERE clause is refused by only_safe_modifications"
            )));
        }
        Ok(())
    }

    /// Rows of a bulk statement must share the first row's columns.
    pub fn check_rows(&self, rows: &[Row]) -> OrmResult<()> {
        let Some(first) = rows.first() else {
            return Ok(());
        };
        self.check_cells(first.cells())?;
        if rows.iter().any(|row| !row.same_shape(first)) {
            return Err(OrmError::validation(
                "all rows must have the same columns in the same order",
            ));
        }
        Ok(())
    }

    /// Validate an upsert and return its first row.
    pub fn check_upsert<'r>(&self, rows: &'r [Row], upsert: &Upsert) -> OrmResult<&'r Row> {
        let first = rows
            .first()
            .ok_or_else(|| OrmError::validation("no rows to upsert"))?;
        self.check_rows(rows)?;
        if upsert.where_columns.is_empty() {
            return Err(OrmError::validation("upsert needs at least one match column"));
        }
        if upsert.update_columns.is_empty() {
            return Err(OrmError::validation("upsert needs at least one update column"));
        }
        let missing = upsert
            .where_columns
            .iter()
            .chain(&upsert.update_columns)
            .find(|name| first.cell(name).is_none());
        if let Some(name) = missing {
            return Err(OrmError::validation(format!(
                "upsert column `{name}` is not part of the row"
            )));
        }
        Ok(first)
    }

    // ==================== Names ====================

    /// Quoted main table, with its alias when `with_alias`.
    pub fn table(&self, with_alias: bool) -> String {
        self.info.table.to_sql(self.dialect(), with_alias)
    }

    /// The quoted name other clauses use for the main table.
    pub fn table_ref(&self) -> String {
        self.name_ref(&self.info.table)
    }

    pub fn name_ref(&self, table: &TableName) -> String {
        match table.alias() {
            Some(alias) => self.dialect().quote_part(alias),
            None => self.dialect().quote(table.name()),
        }
    }

    pub fn has_alias(&self) -> bool {
        self.info.table.alias().is_some()
    }

    pub fn has_joins(&self) -> bool {
        !self.info.joins.is_empty()
    }

    // ==================== Clauses ====================

    pub fn write_distinct(&self, b: &mut QueryBuilder) {
        if self.info.distinct {
            b.add("DISTINCT ");
        }
    }

    pub fn write_select_list(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        if self.info.columns.is_empty() {
            b.add("*");
            return Ok(());
        }
        b.add_join(&self.info.columns, ", ", |b, column| {
            b.add_expression(&column.to_expression(self.info, true)?)?;
            Ok(())
        })?;
        Ok(())
    }

    /// ` FROM table alias` followed by the joins.
    pub fn write_from(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        b.add(" FROM ").add(&self.table(true));
        self.write_joins(b)
    }

    pub fn write_joins(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        for join in &self.info.joins {
            b.add(" ")
                .add(join.kind.sql())
                .add(" ")
                .add(&join.table.to_sql(self.dialect(), true));
            if join.kind != JoinKind::Cross && !join.on.is_empty() {
                b.add(" ON ");
                join.on.build(b, self.info)?;
            }
        }
        Ok(())
    }

    pub fn write_where(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        if !self.info.where_clause.is_empty() {
            b.add(" WHERE ");
            self.info.where_clause.build(b, self.info)?;
        }
        Ok(())
    }

    /// `GROUP BY` and `HAVING`.
    pub fn write_grouping(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        if !self.info.group_by.is_empty() {
            b.add(" GROUP BY ");
            b.add_join(&self.info.group_by, ", ", |b, column| {
                b.add_expression(&column.to_expression(self.info, false)?)?;
                Ok(())
            })?;
        }
        if !self.info.having.is_empty() {
            b.add(" HAVING ");
            self.info.having.build(b, self.info)?;
        }
        Ok(())
    }

    /// FROM, joins, WHERE, GROUP BY and HAVING.
    pub fn write_body(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        self.write_from(b)?;
        self.write_where(b)?;
        self.write_grouping(b)
    }

    /// The ORDER BY items without the keyword.
    pub fn write_order_list(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        b.add_join(&self.info.order_by, ", ", |b, order| {
            b.add_expression(&order.to_expression(self.info)?)?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn write_order_by(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        if !self.info.order_by.is_empty() {
            b.add(" ORDER BY ");
            self.write_order_list(b)?;
        }
        Ok(())
    }

    /// `SELECT [DISTINCT] columns FROM ...` without ordering or paging.
    pub fn write_plain_select(&self, b: &mut QueryBuilder) -> OrmResult<()> {
        b.add("SELECT ");
        self.write_distinct(b);
        self.write_select_list(b)?;
        self.write_body(b)
    }

    /// `[a] = ?, [b] = ?`
    pub fn write_assignments(&self, b: &mut QueryBuilder, cells: &[Cell]) -> OrmResult<()> {
        b.add_join(cells, ", ", |b, cell| {
            b.add_quoted(&cell.name).add(" = ");
            write_param(b, &cell.value)
        })?;
        Ok(())
    }

    /// `([a], [b])`
    pub fn write_column_names<'n>(
        &self,
        b: &mut QueryBuilder,
        names: impl IntoIterator<Item = &'n str>,
    ) {
        b.add("(");
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                b.add(", ");
            }
            b.add_quoted(name);
        }
        b.add(")");
    }

    /// `(?, ?)`
    pub fn write_row_values(&self, b: &mut QueryBuilder, row: &Row) -> OrmResult<()> {
        b.add("(");
        b.add_join(row.cells(), ", ", |b, cell| write_param(b, &cell.value))?;
        b.add(")");
        Ok(())
    }

    /// `INSERT INTO table (columns) VALUES (values)`
    pub fn write_insert(&self, b: &mut QueryBuilder, row: &Row) -> OrmResult<()> {
        self.check_cells(row.cells())?;
        b.add("INSERT INTO ").add(&self.table(false)).add(" ");
        self.write_column_names(b, row.names());
        b.add(" VALUES ");
        self.write_row_values(b, row)
    }

    /// MERGE `ON`, `WHEN MATCHED` and `WHEN NOT MATCHED` clauses.
    pub fn write_merge_clauses(
        &self,
        b: &mut QueryBuilder,
        row: &Row,
        upsert: &Upsert,
        target: &str,
        source: &str,
    ) -> OrmResult<()> {
        let dialect = self.dialect();
        let target = dialect.quote_part(target);
        let source = dialect.quote_part(source);

        b.add(" ON ");
        b.add_join(&upsert.where_columns, " AND ", |b, name| {
            let col = dialect.quote_part(name);
            b.add(&format!("{source}.{col} = {target}.{col}"));
            Ok(())
        })?;
        b.add(" WHEN MATCHED THEN UPDATE SET ");
        b.add_join(&upsert.update_columns, ", ", |b, name| {
            let col = dialect.quote_part(name);
            b.add(&format!("{target}.{col} = {source}.{col}"));
            Ok(())
        })?;
        b.add(" WHEN NOT MATCHED THEN INSERT ");
        self.write_column_names(b, row.names());
        b.add(" VALUES (");
        b.add_join(row.names(), ", ", |b, name| {
            b.add(&format!("{source}.{}", dialect.quote_part(name)));
            Ok(())
        })?;
        b.add(")");
        Ok(())
    }

    // ==================== Shared statements ====================

    pub fn count(&self, column: Option<&Column>) -> OrmResult<SqlExpression> {
        let info = self.info;
        let mut b = self.builder();
        match column {
            Some(column) if column.is_aggregate() => {
                b.add("SELECT ");
                b.add_expression(&column.to_expression(info, true)?)?;
                self.write_body(&mut b)?;
            }
            _ if info.distinct || !info.group_by.is_empty() => {
                b.add("SELECT COUNT(*) FROM (SELECT ");
                self.write_distinct(&mut b);
                match column {
                    Some(column) if !column.is_all() => {
                        b.add_expression(&column.to_expression(info, true)?)?;
                    }
                    _ => self.write_select_list(&mut b)?,
                }
                self.write_body(&mut b)?;
                b.add(") count");
            }
            _ => {
                b.add("SELECT COUNT(");
                match column {
                    Some(column) if !column.is_all() => {
                        b.add_expression(&column.to_expression(info, false)?)?;
                    }
                    _ => {
                        b.add("*");
                    }
                }
                b.add(")");
                self.write_body(&mut b)?;
            }
        }
        Ok(b.to_expression())
    }

    pub fn insert(&self, row: &Row) -> OrmResult<SqlExpression> {
        let mut b = self.builder();
        self.write_insert(&mut b, row)?;
        Ok(b.to_expression())
    }

    pub fn insert_query(&self, select: &QueryInfo, columns: &[String]) -> OrmResult<SqlExpression> {
        let query = super::for_query(select).select()?;
        let mut b = self.builder();
        b.add("INSERT INTO ").add(&self.table(false)).add(" ");
        if !columns.is_empty() {
            self.write_column_names(&mut b, columns.iter().map(String::as_str));
            b.add(" ");
        }
        b.add_expression(&query)?;
        Ok(b.to_expression())
    }

    /// Multi-row `VALUES` insert, one statement per batch.
    pub fn bulk_insert_values(&self, rows: &[Row]) -> OrmResult<Vec<SqlExpression>> {
        self.check_rows(rows)?;
        let mut out = Vec::new();
        for batch in self.batches(rows) {
            let Some(first) = batch.first() else {
                continue;
            };
            let mut b = self.builder();
            b.add("INSERT INTO ").add(&self.table(false)).add(" ");
            self.write_column_names(&mut b, first.names());
            b.add(" VALUES ");
            b.add_join(batch, ", ", |b, row| self.write_row_values(b, row))?;
            self.trace_batch(batch.len(), b.param_count());
            out.push(b.to_expression());
        }
        Ok(out)
    }

    /// Split rows so that no batch exceeds the parameter or row ceiling.
    pub fn batches<'r>(&self, rows: &'r [Row]) -> Vec<&'r [Row]> {
        let max_params = self.dialect().max_parameters();
        let max_rows = self.info.config.bulk_rows().max(1);
        let probe = self.builder();

        let mut out = Vec::new();
        let mut start = 0;
        let mut params = 0;
        for (i, row) in rows.iter().enumerate() {
            let bound = bound_count(&probe, row);
            let len = i - start;
            if len > 0 && (len >= max_rows || params + bound > max_params) {
                out.push(&rows[start..i]);
                start = i;
                params = 0;
            }
            params += bound;
        }
        if start < rows.len() {
            out.push(&rows[start..]);
        }
        out
    }

    pub fn trace_batch(&self, rows: usize, params: usize) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "polyorm.sql",
            dialect = self.dialect().name(),
            table = self.info.table.name(),
            rows,
            params,
            "bulk insert batch"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (rows, params);
    }
}

/// Write a cell value: a value goes through the builder's binding policy, an
/// expression is spliced.
pub(crate) fn write_param(b: &mut QueryBuilder, param: &SqlParam) -> OrmResult<()> {
    match param {
        SqlParam::Value(v) => {
            b.add_value(v.clone())?;
        }
        SqlParam::Expression(e) => {
            b.add_expression(e)?;
        }
    }
    Ok(())
}

/// Number of values of `row` the builder would bind.
fn bound_count(b: &QueryBuilder, row: &Row) -> usize {
    let binds = |v: &crate::value::Value| b.binds(&b.intercept(v.clone()));
    row.cells()
        .iter()
        .map(|cell| match &cell.value {
            SqlParam::Value(v) => usize::from(binds(v)),
            SqlParam::Expression(e) => e.values().iter().filter(|v| binds(*v)).count(),
        })
        .sum()
}
