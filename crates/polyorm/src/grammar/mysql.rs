use super::{Grammar, GrammarBase, Upsert};
use crate::builder::QueryBuilder;
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::query::QueryInfo;
use crate::row::{Cell, Row};

/// MySQL: `LIMIT`/`OFFSET` paging, multi-table UPDATE/DELETE, `ON DUPLICATE KEY` upserts.
pub struct MysqlGrammar<'a> {
    base: GrammarBase<'a>,
}

impl<'a> MysqlGrammar<'a> {
    pub fn new(info: &'a QueryInfo) -> Self {
        Self {
            base: GrammarBase::new(info),
        }
    }

    fn write_limit(&self, b: &mut QueryBuilder) {
        let info = self.base.info();
        match (info.limit, info.offset) {
            (Some(limit), Some(offset)) => b.add(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => b.add(&format!(" LIMIT {limit}")),
            // MySQL has no OFFSET without LIMIT.
            (None, Some(offset)) => b.add(&format!(" LIMIT 18446744073709551615 OFFSET {offset}")),
            (None, None) => b,
        };
    }

    /// Checks shared by UPDATE and DELETE. Multi-table forms take no LIMIT or ORDER BY.
    fn check_modification(&self, statement: &str, multi_table: bool) -> OrmResult<()> {
        let info = self.base.info();
        self.base.reject(!info.having.is_empty(), "HAVING", statement)?;
        self.base.reject(info.offset.is_some(), "OFFSET", statement)?;
        self.base
            .reject(multi_table && info.limit.is_some(), "LIMIT with JOIN", statement)?;
        self.base
            .reject(multi_table && !info.order_by.is_empty(), "ORDER BY with JOIN", statement)?;
        self.base.check_safe(statement)
    }

    fn write_delete(&self, targets: &[String]) -> OrmResult<SqlExpression> {
        let mut b = self.base.builder();
        b.add("DELETE ").add(&targets.join(", "));
        self.base.write_from(&mut b)?;
        self.base.write_where(&mut b)?;
        Ok(b.to_expression())
    }
}

impl Grammar for MysqlGrammar<'_> {
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

    fn insert_get_id(&self, row: &Row, _key: &str) -> OrmResult<SqlExpression> {
        let mut b = self.base.builder();
        self.base.write_insert(&mut b, row)?;
        b.add("; SELECT LAST_INSERT_ID();");
        Ok(b.to_expression())
    }

    fn update(&self, cells: &[Cell]) -> OrmResult<SqlExpression> {
        self.base.check_cells(cells)?;
        self.check_modification("UPDATE", self.base.has_joins())?;

        let mut b = self.base.builder();
        b.add("UPDATE ").add(&self.base.table(true));
        self.base.write_joins(&mut b)?;
        b.add(" SET ");
        self.base.write_assignments(&mut b, cells)?;
        self.base.write_where(&mut b)?;
        self.base.write_order_by(&mut b)?;
        self.write_limit(&mut b);
        Ok(b.to_expression())
    }

    fn delete(&self) -> OrmResult<SqlExpression> {
        let multi_table = self.base.has_joins() || self.base.has_alias();
        self.check_modification("DELETE", multi_table)?;
        if multi_table {
            return self.write_delete(&[self.base.table_ref()]);
        }

        let mut b = self.base.builder();
        b.add("DELETE FROM ").add(&self.base.table(false));
        self.base.write_where(&mut b)?;
        self.base.write_order_by(&mut b)?;
        self.write_limit(&mut b);
        Ok(b.to_expression())
    }

    fn delete_including_joins(&self) -> OrmResult<SqlExpression> {
        if !self.base.has_joins() {
            return self.delete();
        }
        self.check_modification("DELETE", true)?;
        let info = self.base.info();
        let targets: Vec<String> = std::iter::once(self.base.table_ref())
            .chain(info.joins.iter().map(|join| self.base.name_ref(&join.table)))
            .collect();
        self.write_delete(&targets)
    }

    fn upsert_rows(&self, rows: &[Row], upsert: &Upsert) -> OrmResult<SqlExpression> {
        let first = self.base.check_upsert(rows, upsert)?;
        let dialect = self.base.dialect();

        let mut b = self.base.builder();
        b.add("INSERT INTO ").add(&self.base.table(false)).add(" ");
        self.base.write_column_names(&mut b, first.names());
        b.add(" VALUES ");
        b.add_join(rows, ", ", |b, row| self.base.write_row_values(b, row))?;
        b.add(" ON DUPLICATE KEY UPDATE ");
        b.add_join(&upsert.update_columns, ", ", |b, name| {
            let col = dialect.quote_part(name);
            b.add(&format!("{col} = VALUES({col})"));
            Ok(())
        })?;
        Ok(b.to_expression())
    }
}
