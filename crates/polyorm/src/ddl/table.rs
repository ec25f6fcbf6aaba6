use super::{ColumnDef, Constraint, Index, TableSchema};
use crate::builder::QueryBuilder;
use crate::config::QueryConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expression::SqlExpression;
use crate::grammar::{self, write_param};
use crate::query::QueryInfo;

/// Renders table DDL for the configured dialect.
///
/// Values inside DDL (column defaults) are always inlined; only the table
/// lookup of [`exists`](TableGrammar::exists) binds a parameter.
#[derive(Debug, Clone, Copy)]
pub struct TableGrammar<'a> {
    config: &'a QueryConfig,
}

impl<'a> TableGrammar<'a> {
    pub fn new(config: &'a QueryConfig) -> Self {
        Self { config }
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.config).no_parameters()
    }

    fn unsupported(&self, feature: &str) -> OrmError {
        OrmError::not_supported(feature, self.dialect().name())
    }

    fn check_name(name: &str) -> OrmResult<()> {
        if name.trim().is_empty() {
            return Err(OrmError::validation("table name cannot be empty"));
        }
        Ok(())
    }

    /// Name used for a temporary table. SQL Server temp tables live under `#`.
    fn table_name(&self, name: &str, temporary: bool) -> String {
        if temporary && self.dialect() == Dialect::SqlServer && !name.starts_with('#') {
            return format!("#{name}");
        }
        name.to_string()
    }

    // ==================== CREATE / DROP ====================

    pub fn create(&self, schema: &TableSchema) -> OrmResult<SqlExpression> {
        Self::check_name(&schema.name)?;
        if schema.columns.is_empty() {
            return Err(OrmError::validation(format!(
                "table {} has no columns",
                schema.name
            )));
        }
        let dialect = self.dialect();
        let name = self.table_name(&schema.name, schema.temporary);

        let mut b = self.builder();
        b.add(match (dialect, schema.temporary) {
            (_, false) => "CREATE TABLE ",
            (Dialect::SqlServer, true) => "CREATE TABLE ",
            (Dialect::Mysql, true) => "CREATE TEMPORARY TABLE ",
            (Dialect::Sqlite, true) => "CREATE TEMP TABLE ",
            (Dialect::Firebird, true) => "CREATE GLOBAL TEMPORARY TABLE ",
        });
        b.add_quoted(&name).add(" (");

        // SQLite declares an autoincrement key inline and cannot repeat it.
        let inline_key = dialect == Dialect::Sqlite
            && schema.columns.iter().any(|c| c.auto_increment);

        b.add_join(&schema.columns, ", ", |b, column| self.write_column(b, column))?;

        if let Some(pk) = schema.primary_key().filter(|_| !inline_key) {
            b.add(", ");
            self.write_constraint(&mut b, &Constraint::PrimaryKey(pk));
        }
        for constraint in &schema.constraints {
            if matches!(constraint, Constraint::PrimaryKey(_)) {
                continue;
            }
            b.add(", ");
            self.write_constraint(&mut b, constraint);
        }
        b.add(")");
        if schema.temporary && dialect == Dialect::Firebird {
            b.add(" ON COMMIT PRESERVE ROWS");
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target: "polyorm.sql",
            dialect = dialect.name(),
            table = %name,
            columns = schema.columns.len(),
            "create table"
        );
        Ok(b.to_expression())
    }

    /// A new table filled from a query (`CREATE TABLE AS SELECT`, `SELECT INTO`).
    pub fn create_based_on(&self, name: &str, query: &QueryInfo) -> OrmResult<SqlExpression> {
        Self::check_name(name)?;
        let dialect = self.dialect();
        if dialect == Dialect::Firebird {
            return Err(self.unsupported("CREATE TABLE from a query"));
        }
        let select = grammar::for_query(query).select()?;

        let mut b = QueryBuilder::new(self.config);
        match dialect {
            Dialect::SqlServer => {
                b.add("SELECT * INTO ").add_quoted(name).add(" FROM (");
                b.add_expression(&select)?;
                b.add(") ").add(&dialect.quote_part("source"));
            }
            _ => {
                b.add("CREATE TABLE ").add_quoted(name).add(" AS ");
                b.add_expression(&select)?;
            }
        }
        Ok(b.to_expression())
    }

    pub fn drop(&self, name: &str) -> OrmResult<SqlExpression> {
        Self::check_name(name)?;
        let mut b = self.builder();
        b.add("DROP TABLE ").add_quoted(name);
        Ok(b.to_expression())
    }

    /// A query returning the number of tables called `name` (0 or 1).
    pub fn exists(&self, name: &str) -> OrmResult<SqlExpression> {
        Self::check_name(name)?;
        let mut b = QueryBuilder::for_dialect(self.dialect());
        match self.dialect() {
            Dialect::SqlServer if name.starts_with('#') => {
                b.add("SELECT CASE WHEN OBJECT_ID(");
                b.add_bound(format!("tempdb..{name}").into())?;
                b.add(") IS NULL THEN 0 ELSE 1 END");
            }
            Dialect::SqlServer => {
                b.add("SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_NAME = ");
                b.add_bound(name.into())?;
            }
            Dialect::Mysql => {
                b.add(
                    "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = DATABASE() AND table_name = ",
                );
                b.add_bound(name.into())?;
            }
            Dialect::Sqlite => {
                b.add("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ");
                b.add_bound(name.into())?;
            }
            Dialect::Firebird => {
                b.add("SELECT COUNT(*) FROM RDB$RELATIONS WHERE RDB$RELATION_NAME = ");
                b.add_bound(name.into())?;
            }
        }
        Ok(b.to_expression())
    }

    /// Remove every row. Engines without `TRUNCATE` get a plain `DELETE`.
    pub fn truncate(&self, name: &str) -> OrmResult<SqlExpression> {
        Self::check_name(name)?;
        let mut b = self.builder();
        match self.dialect() {
            Dialect::SqlServer | Dialect::Mysql => b.add("TRUNCATE TABLE "),
            Dialect::Sqlite | Dialect::Firebird => b.add("DELETE FROM "),
        };
        b.add_quoted(name);
        Ok(b.to_expression())
    }

    // ==================== Constraints / indexes ====================

    pub fn add_constraint(&self, constraint: &Constraint) -> OrmResult<SqlExpression> {
        if self.dialect() == Dialect::Sqlite {
            return Err(self.unsupported("ALTER TABLE ADD CONSTRAINT"));
        }
        let mut b = self.builder();
        b.add("ALTER TABLE ").add_quoted(constraint.table()).add(" ADD ");
        self.write_constraint(&mut b, constraint);
        Ok(b.to_expression())
    }

    pub fn drop_constraint(&self, table: &str, name: &str) -> OrmResult<SqlExpression> {
        Self::check_name(table)?;
        if self.dialect() == Dialect::Sqlite {
            return Err(self.unsupported("ALTER TABLE DROP CONSTRAINT"));
        }
        if name.trim().is_empty() {
            return Err(OrmError::validation("constraint name cannot be empty"));
        }
        let mut b = self.builder();
        b.add("ALTER TABLE ")
            .add_quoted(table)
            .add(" DROP CONSTRAINT ")
            .add_quoted(name);
        Ok(b.to_expression())
    }

    pub fn create_index(&self, index: &Index) -> OrmResult<SqlExpression> {
        let mut b = self.builder();
        b.add(if index.unique {
            "CREATE UNIQUE INDEX "
        } else {
            "CREATE INDEX "
        });
        b.add_quoted(&index.name)
            .add(" ON ")
            .add_quoted(&index.table)
            .add(" ");
        self.write_name_list(&mut b, &index.columns);
        Ok(b.to_expression())
    }

    pub fn drop_index(&self, table: &str, name: &str) -> OrmResult<SqlExpression> {
        if name.trim().is_empty() {
            return Err(OrmError::validation("index name cannot be empty"));
        }
        let mut b = self.builder();
        b.add("DROP INDEX ").add_quoted(name);
        if matches!(self.dialect(), Dialect::SqlServer | Dialect::Mysql) {
            Self::check_name(table)?;
            b.add(" ON ").add_quoted(table);
        }
        Ok(b.to_expression())
    }

    // ==================== Writers ====================

    fn write_column(&self, b: &mut QueryBuilder, column: &ColumnDef) -> OrmResult<()> {
        if column.name.trim().is_empty() || column.sql_type.trim().is_empty() {
            return Err(OrmError::validation("column name and type cannot be empty"));
        }
        let dialect = self.dialect();
        b.add_quoted(&column.name).add(" ").add(&column.sql_type);
        if column.auto_increment {
            b.add(match dialect {
                Dialect::SqlServer => " IDENTITY(1,1)",
                Dialect::Mysql => " AUTO_INCREMENT",
                Dialect::Sqlite => " PRIMARY KEY AUTOINCREMENT",
                Dialect::Firebird => " GENERATED BY DEFAULT AS IDENTITY",
            });
        }
        if let Some(default) = &column.default {
            b.add(" DEFAULT ");
            write_param(b, default)?;
        }
        if !column.nullable {
            b.add(" NOT NULL");
        }
        Ok(())
    }

    /// `(a,b)`: constraint and index column lists carry no spaces.
    fn write_name_list(&self, b: &mut QueryBuilder, names: &[String]) {
        let dialect = self.dialect();
        let quoted: Vec<String> = names.iter().map(|n| dialect.quote(n)).collect();
        b.add("(").add(&quoted.join(",")).add(")");
    }

    fn write_constraint(&self, b: &mut QueryBuilder, constraint: &Constraint) {
        b.add("CONSTRAINT ").add_quoted(constraint.name()).add(" ");
        match constraint {
            Constraint::PrimaryKey(pk) => {
                b.add("PRIMARY KEY ");
                self.write_name_list(b, &pk.columns);
            }
            Constraint::Unique(uc) => {
                b.add("UNIQUE ");
                self.write_name_list(b, &uc.columns);
            }
            Constraint::ForeignKey(fk) => {
                b.add("FOREIGN KEY ");
                self.write_name_list(b, std::slice::from_ref(&fk.column));
                b.add(" REFERENCES ").add_quoted(&fk.ref_table).add(" ");
                self.write_name_list(b, std::slice::from_ref(&fk.ref_column));
                if let Some(action) = fk.on_delete {
                    b.add(" ON DELETE ").add(action.sql());
                }
                if let Some(action) = fk.on_update {
                    b.add(" ON UPDATE ").add(action.sql());
                }
            }
            Constraint::Check(ck) => {
                b.add("CHECK (").add(&ck.expression).add(")");
            }
        }
    }
}
