use super::{Grammar, GrammarBase, Upsert};
use crate::builder::QueryBuilder;
use crate::error::{OrmError, OrmResult};
use crate::expression::{SqlExpression, SqlParam};
use crate::query::QueryInfo;
use crate::row::{Cell, Row};
use crate::value::Value;

/// Firebird: `FIRST`/`SKIP` and `ROWS` paging, `EXECUTE BLOCK` bulk inserts,
/// `MERGE` upserts from `RDB$DATABASE`.
pub struct FirebirdGrammar<'a> {
    base: GrammarBase<'a>,
}

impl<'a> FirebirdGrammar<'a> {
    pub fn new(info: &'a QueryInfo) -> Self {
        Self {
            base: GrammarBase::new(info),
        }
    }

    fn check_modification(&self, statement: &str) -> OrmResult<()> {
        let info = self.base.info();
        self.base.reject(self.base.has_joins(), "JOIN", statement)?;
        self.base.reject(!info.having.is_empty(), "HAVING", statement)?;
        self.base.reject(
            info.offset.is_some() && info.limit.is_none(),
            "OFFSET without LIMIT",
            statement,
        )?;
        self.base.check_safe(statement)
    }

    /// `ROWS n` or `ROWS a TO b` (1-based, inclusive).
    fn write_rows(&self, b: &mut QueryBuilder) {
        let info = self.base.info();
        match (info.limit, info.offset) {
            (Some(limit), Some(offset)) => {
                b.add(&format!(
                    " ROWS {} TO {}",
                    offset.saturating_add(1),
                    offset.saturating_add(limit)
                ));
            }
            (Some(limit), None) => {
                b.add(&format!(" ROWS {limit}"));
            }
            _ => {}
        }
    }

    /// One `EXECUTE BLOCK` for a batch. Bound values are declared as block
    /// parameters and referenced as `:pN` inside the body.
    fn execute_block(&self, rows: &[Row]) -> OrmResult<SqlExpression> {
        let mut b = self.base.builder();

        let mut declared = Vec::new();
        for row in rows {
            for cell in row.cells() {
                match &cell.value {
                    SqlParam::Value(v) => {
                        let v = b.intercept(v.clone());
                        if b.binds(&v) {
                            declared.push((block_type(&v), v));
                        }
                    }
                    SqlParam::Expression(e) if !e.values().is_empty() => {
                        return Err(self
                            .base
                            .unsupported("bound expression values in EXECUTE BLOCK"));
                    }
                    SqlParam::Expression(_) => {}
                }
            }
        }

        b.add("EXECUTE BLOCK ");
        if !declared.is_empty() {
            b.add("(");
            b.add_join(declared.into_iter().enumerate(), ", ", |b, (i, (ty, v))| {
                b.add(&format!("p{} {ty} = ", i + 1));
                b.add_bound(v)?;
                Ok(())
            })?;
            b.add(") ");
        }
        b.add("AS BEGIN ");

        let table = self.base.table(false);
        let mut next = 0;
        for row in rows {
            b.add("INSERT INTO ").add(&table).add(" ");
            self.base.write_column_names(&mut b, row.names());
            b.add(" VALUES (");
            b.add_join(row.cells(), ", ", |b, cell| {
                match &cell.value {
                    SqlParam::Value(v) => {
                        let v = b.intercept(v.clone());
                        if b.binds(&v) {
                            next += 1;
                            b.add(&format!(":p{next}"));
                        } else {
                            b.add_value(v)?;
                        }
                    }
                    SqlParam::Expression(e) => {
                        b.add_expression(e)?;
                    }
                }
                Ok(())
            })?;
            b.add("); ");
        }
        b.add("END");
        Ok(b.to_expression())
    }
}

impl Grammar for FirebirdGrammar<'_> {
    fn base(&self) -> &GrammarBase<'_> {
        &self.base
    }

    fn select(&self) -> OrmResult<SqlExpression> {
        let info = self.base.info();
        let mut b = self.base.builder();
        b.add("SELECT ");
        if let Some(limit) = info.limit {
            b.add(&format!("FIRST {limit} "));
        }
        if let Some(offset) = info.offset {
            b.add(&format!("SKIP {offset} "));
        }
        self.base.write_distinct(&mut b);
        self.base.write_select_list(&mut b)?;
        self.base.write_body(&mut b)?;
        self.base.write_order_by(&mut b)?;
        Ok(b.to_expression())
    }

    fn insert_get_id(&self, row: &Row, key: &str) -> OrmResult<SqlExpression> {
        if key.trim().is_empty() {
            return Err(OrmError::validation("RETURNING needs a key column"));
        }
        let mut b = self.base.builder();
        self.base.write_insert(&mut b, row)?;
        b.add(" RETURNING ").add_quoted(key);
        Ok(b.to_expression())
    }

    fn bulk_insert(&self, rows: &[Row]) -> OrmResult<Vec<SqlExpression>> {
        self.base.check_rows(rows)?;
        let mut out = Vec::new();
        for batch in self.base.batches(rows) {
            let block = self.execute_block(batch)?;
            self.base.trace_batch(batch.len(), block.values().len());
            out.push(block);
        }
        Ok(out)
    }

    fn update(&self, cells: &[Cell]) -> OrmResult<SqlExpression> {
        self.base.check_cells(cells)?;
        self.check_modification("UPDATE")?;

        let mut b = self.base.builder();
        b.add("UPDATE ").add(&self.base.table(true)).add(" SET ");
        self.base.write_assignments(&mut b, cells)?;
        self.base.write_where(&mut b)?;
        self.base.write_order_by(&mut b)?;
        self.write_rows(&mut b);
        Ok(b.to_expression())
    }

    fn delete(&self) -> OrmResult<SqlExpression> {
        self.check_modification("DELETE")?;

        let mut b = self.base.builder();
        b.add("DELETE FROM ").add(&self.base.table(true));
        self.base.write_where(&mut b)?;
        self.base.write_order_by(&mut b)?;
        self.write_rows(&mut b);
        Ok(b.to_expression())
    }

    fn delete_including_joins(&self) -> OrmResult<SqlExpression> {
        Err(self.base.unsupported("DELETE including joined tables"))
    }

    fn upsert_rows(&self, rows: &[Row], upsert: &Upsert) -> OrmResult<SqlExpression> {
        let first = self.base.check_upsert(rows, upsert)?;
        let dialect = self.base.dialect();

        let mut b = self.base.builder();
        b.add("MERGE INTO ")
            .add(&self.base.table(false))
            .add(" ")
            .add(&dialect.quote_part("Target"))
            .add(" USING (");
        b.add_join(rows, " UNION ALL ", |b, row| {
            b.add("SELECT ");
            b.add_join(row.cells(), ", ", |b, cell| {
                match &cell.value {
                    SqlParam::Value(v) => {
                        let v = b.intercept(v.clone());
                        let ty = block_type(&v);
                        b.add("CAST(");
                        b.add_value(v)?;
                        b.add(" AS ").add(&ty).add(")");
                    }
                    SqlParam::Expression(e) => {
                        b.add_expression(e)?;
                    }
                }
                b.add(" AS ").add_quoted(&cell.name);
                Ok(())
            })?;
            b.add(" FROM RDB$DATABASE");
            Ok(())
        })?;
        b.add(") ").add(&dialect.quote_part("Source"));
        self.base
            .write_merge_clauses(&mut b, first, upsert, "Target", "Source")?;
        Ok(b.to_expression())
    }
}

/// Firebird type used to declare a block parameter or cast a merge source value.
fn block_type(value: &Value) -> String {
    match value {
        Value::Null => "CHAR(1)".to_string(),
        Value::Bool(_) => "BOOLEAN".to_string(),
        Value::Int(_) => "BIGINT".to_string(),
        Value::Float(_) => "DOUBLE PRECISION".to_string(),
        #[cfg(feature = "rust_decimal")]
        Value::Decimal(_) => "DECIMAL(18,4)".to_string(),
        Value::Text(s) => format!("VARCHAR({})", s.chars().count().max(1)),
        Value::Bytes(_) => "BLOB".to_string(),
        Value::Date(_) => "DATE".to_string(),
        Value::Time(_) => "TIME".to_string(),
        Value::DateTime(_) => "TIMESTAMP".to_string(),
        Value::Uuid(_) => "CHAR(36)".to_string(),
        Value::Json(_) => "BLOB SUB_TYPE TEXT".to_string(),
    }
}
