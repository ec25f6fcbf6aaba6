use super::{Grammar, GrammarBase, Upsert};
use crate::builder::QueryBuilder;
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::query::QueryInfo;
use crate::row::{Cell, Row};

/// SQLite: `LIMIT`/`OFFSET` paging, single-table modifications, `ON CONFLICT` upserts.
pub struct SqliteGrammar<'a> {
    base: GrammarBase<'a>,
}

impl<'a> SqliteGrammar<'a> {
    pub fn new(info: &'a QueryInfo) -> Self {
        Self {
            base: GrammarBase::new(info),
        }
    }

    /// INSERT, UPDATE and DELETE take none of the query modifiers.
    fn reject_modifiers(&self, statement: &str) -> OrmResult<()> {
        let info = self.base.info();
        self.base.reject(self.base.has_joins(), "JOIN", statement)?;
        self.base.reject(info.limit.is_some(), "LIMIT", statement)?;
        self.base.reject(info.offset.is_some(), "OFFSET", statement)?;
        self.base.reject(!info.order_by.is_empty(), "ORDER BY", statement)?;
        self.base.reject(!info.having.is_empty(), "HAVING", statement)
    }

    fn write_limit(&self, b: &mut QueryBuilder) {
        let info = self.base.info();
        match (info.limit, info.offset) {
            (Some(limit), Some(offset)) => b.add(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => b.add(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => b.add(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => b,
        };
    }
}

impl Grammar for SqliteGrammar<'_> {
    fn base(&self) -> &GrammarBase<'_> {
        &self.base
    }

    fn select(&self) -> OrmResult<SqlExpression> {
        let mut b = self.base.builder();
        self.base.write_plain_select(&mut b)?;
        self.base.write_order_by(&mut b)?;
        self.write_limit(&mut b);
        Ok(b.to_expression())
    }

    fn insert(&self, row: &Row) -> OrmResult<SqlExpression> {
        self.reject_modifiers("INSERT")?;
        self.base.insert(row)
    }

    fn insert_get_id(&self, row: &Row, _key: &str) -> OrmResult<SqlExpression> {
        self.reject_modifiers("INSERT")?;
        let mut b = self.base.builder();
        self.base.write_insert(&mut b, row)?;
        b.add("; SELECT last_insert_rowid();");
        Ok(b.to_expression())
    }

    fn insert_query(&self, select: &QueryInfo, columns: &[String]) -> OrmResult<SqlExpression> {
        self.reject_modifiers("INSERT")?;
        self.base.insert_query(select, columns)
    }

    fn bulk_insert(&self, rows: &[Row]) -> OrmResult<Vec<SqlExpression>> {
        self.reject_modifiers("INSERT")?;
        self.base.bulk_insert_values(rows)
    }

    fn update(&self, cells: &[Cell]) -> OrmResult<SqlExpression> {
        self.base.check_cells(cells)?;
        self.reject_modifiers("UPDATE")?;
        self.base.check_safe("UPDATE")?;

        let info = self.base.info();
        let dialect = self.base.dialect();
        let mut b = self.base.builder();
        b.add("UPDATE ").add(&self.base.table(false));
        if let Some(alias) = info.table.alias() {
            b.add(" AS ").add(&dialect.quote_part(alias));
        }
        b.add(" SET ");
        self.base.write_assignments(&mut b, cells)?;
        self.base.write_where(&mut b)?;
        Ok(b.to_expression())
    }

    fn delete(&self) -> OrmResult<SqlExpression> {
        self.reject_modifiers("DELETE")?;
        self.base.reject(self.base.has_alias(), "table alias", "DELETE")?;
        self.base.check_safe("DELETE")?;

        let mut b = self.base.builder();
        b.add("DELETE FROM ").add(&self.base.table(false));
        self.base.write_where(&mut b)?;
        Ok(b.to_expression())
    }

    fn delete_including_joins(&self) -> OrmResult<SqlExpression> {
        self.delete()
    }

    fn upsert_rows(&self, rows: &[Row], upsert: &Upsert) -> OrmResult<SqlExpression> {
        self.base.reject(rows.len() > 1, "multi-row upsert", "INSERT")?;
        self.reject_modifiers("INSERT")?;
        let first = self.base.check_upsert(rows, upsert)?;
        let dialect = self.base.dialect();

        let mut b = self.base.builder();
        self.base.write_insert(&mut b, first)?;
        b.add(" ON CONFLICT ");
        self.base
            .write_column_names(&mut b, upsert.where_columns.iter().map(String::as_str));
        b.add(" DO UPDATE SET ");
        b.add_join(&upsert.update_columns, ", ", |b, name| {
            let col = dialect.quote_part(name);
            b.add(&format!("{col} = excluded.{col}"));
            Ok(())
        })?;
        Ok(b.to_expression())
    }
}
