use super::{Grammar, GrammarBase, Upsert};
use crate::builder::QueryBuilder;
use crate::error::{OrmError, OrmResult};
use crate::expression::SqlExpression;
use crate::query::QueryInfo;
use crate::row::{Cell, Row};

const ROW_NUMBER_COLUMN: &str = "grammar_rownum";

/// SQL Server: `TOP (n)`, `OFFSET ... FETCH` or `ROW_NUMBER()` paging, MERGE upserts.
pub struct SqlServerGrammar<'a> {
    base: GrammarBase<'a>,
}

impl<'a> SqlServerGrammar<'a> {
    pub fn new(info: &'a QueryInfo) -> Self {
        Self {
            base: GrammarBase::new(info),
        }
    }

    fn write_top(&self, b: &mut QueryBuilder) {
        if let Some(limit) = self.base.info().limit {
            b.add(&format!("TOP ({limit}) "));
        }
    }

    /// `... ORDER BY ... OFFSET n ROWS [FETCH NEXT m ROWS ONLY]`
    fn write_offset_fetch(&self, b: &mut QueryBuilder, offset: u64) -> OrmResult<()> {
        let info = self.base.info();
        self.base.write_plain_select(b)?;
        self.base.write_order_by(b)?;
        b.add(&format!(" OFFSET {offset} ROWS"));
        if let Some(limit) = info.limit {
            b.add(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
        Ok(())
    }

    /// Paging through a `ROW_NUMBER()` window over the ORDER BY columns.
    fn write_row_number(&self, b: &mut QueryBuilder, offset: u64) -> OrmResult<()> {
        let info = self.base.info();
        if info.distinct {
            return Err(self.base.unsupported("DISTINCT with ROW_NUMBER pagination"));
        }
        let dialect = self.base.dialect();
        let rownum = dialect.quote_part(ROW_NUMBER_COLUMN);

        b.add("SELECT * FROM (SELECT ROW_NUMBER() OVER(ORDER BY ");
        self.base.write_order_list(b)?;
        b.add(&format!(") AS {rownum}, "));
        self.base.write_select_list(b)?;
        self.base.write_body(b)?;
        b.add(") ")
            .add(&dialect.quote_part(info.table.alias_or_name()))
            .add(" WHERE ")
            .add(&rownum);
        match info.limit {
            Some(limit) => b.add(&format!(
                " BETWEEN {} AND {}",
                offset.saturating_add(1),
                offset.saturating_add(limit)
            )),
            None => b.add(&format!(" > {offset}")),
        };
        Ok(())
    }
}

impl Grammar for SqlServerGrammar<'_> {
    fn base(&self) -> &GrammarBase<'_> {
        &self.base
    }

    fn select(&self) -> OrmResult<SqlExpression> {
        let info = self.base.info();
        let mut b = self.base.builder();
        match info.offset {
            None => {
                b.add("SELECT ");
                self.base.write_distinct(&mut b);
                self.write_top(&mut b);
                self.base.write_select_list(&mut b)?;
                self.base.write_body(&mut b)?;
                self.base.write_order_by(&mut b)?;
            }
            Some(_) if info.order_by.is_empty() => {
                return Err(OrmError::validation(
                    "an offset requires at least one ORDER BY column",
                ));
            }
            Some(offset) if info.config.use_old_pagination => {
                self.write_row_number(&mut b, offset)?;
            }
            Some(offset) => self.write_offset_fetch(&mut b, offset)?,
        }
        Ok(b.to_expression())
    }

    fn insert_get_id(&self, row: &Row, _key: &str) -> OrmResult<SqlExpression> {
        let mut b = self.base.builder();
        self.base.write_insert(&mut b, row)?;
        b.add("; SELECT SCOPE_IDENTITY();");
        Ok(b.to_expression())
    }

    fn update(&self, cells: &[Cell]) -> OrmResult<SqlExpression> {
        let info = self.base.info();
        self.base.check_cells(cells)?;
        self.base.reject(!info.order_by.is_empty(), "ORDER BY", "UPDATE")?;
        self.base.reject(info.offset.is_some(), "OFFSET", "UPDATE")?;
        self.base.reject(!info.having.is_empty(), "HAVING", "UPDATE")?;
        self.base.check_safe("UPDATE")?;

        let mut b = self.base.builder();
        b.add("UPDATE ");
        self.write_top(&mut b);
        if self.base.has_joins() || self.base.has_alias() {
            b.add(&self.base.table_ref()).add(" SET ");
            self.base.write_assignments(&mut b, cells)?;
            self.base.write_from(&mut b)?;
        } else {
            b.add(&self.base.table(false)).add(" SET ");
            self.base.write_assignments(&mut b, cells)?;
        }
        self.base.write_where(&mut b)?;
        Ok(b.to_expression())
    }

    fn delete(&self) -> OrmResult<SqlExpression> {
        let info = self.base.info();
        self.base.reject(!info.order_by.is_empty(), "ORDER BY", "DELETE")?;
        self.base.reject(info.offset.is_some(), "OFFSET", "DELETE")?;
        self.base.reject(!info.having.is_empty(), "HAVING", "DELETE")?;
        self.base.check_safe("DELETE")?;

        let mut b = self.base.builder();
        b.add("DELETE ");
        self.write_top(&mut b);
        if self.base.has_joins() || self.base.has_alias() {
            b.add(&self.base.table_ref());
            self.base.write_from(&mut b)?;
        } else {
            b.add("FROM ").add(&self.base.table(false));
        }
        self.base.write_where(&mut b)?;
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
            .add(" USING (VALUES ");
        b.add_join(rows, ", ", |b, row| self.base.write_row_values(b, row))?;
        b.add(") AS ").add(&dialect.quote_part("Source")).add(" ");
        self.base.write_column_names(&mut b, first.names());
        self.base
            .write_merge_clauses(&mut b, first, upsert, "Target", "Source")?;
        b.add(";");
        Ok(b.to_expression())
    }
}
