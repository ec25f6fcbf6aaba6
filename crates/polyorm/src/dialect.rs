//! Target SQL engines and their fixed lexical rules.

use crate::value::Value;
use serde::Deserialize;

/// A target SQL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    SqlServer,
    Mysql,
    Sqlite,
    Firebird,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::SqlServer,
        Dialect::Mysql,
        Dialect::Sqlite,
        Dialect::Firebird,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::SqlServer => "SqlServer",
            Dialect::Mysql => "MySQL",
            Dialect::Sqlite => "SQLite",
            Dialect::Firebird => "Firebird",
        }
    }

    /// Opening and closing identifier quote characters.
    pub fn quotes(self) -> (char, char) {
        match self {
            Dialect::SqlServer => ('[', ']'),
            Dialect::Mysql => ('`', '`'),
            Dialect::Sqlite | Dialect::Firebird => ('"', '"'),
        }
    }

    /// Quote a single identifier part. `*` is never quoted.
    pub fn quote_part(self, part: &str) -> String {
        if part == "*" {
            return part.to_string();
        }
        let (open, close) = self.quotes();
        let mut out = String::with_capacity(part.len() + 2);
        out.push(open);
        for ch in part.chars() {
            if ch == close {
                out.push(close);
            }
            out.push(ch);
        }
        out.push(close);
        out
    }

    /// Quote a possibly dotted identifier (`t1.Name` -> `[t1].[Name]`).
    pub fn quote(self, ident: &str) -> String {
        let (open, _) = self.quotes();
        if ident.starts_with(open) {
            return ident.to_string();
        }
        ident
            .split('.')
            .map(|part| self.quote_part(part.trim()))
            .collect::<Vec<_>>()
            .join(".")
    }

    pub fn bool_literal(self, value: bool) -> &'static str {
        match (self, value) {
            (Dialect::Firebird, true) => "TRUE",
            (Dialect::Firebird, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Escape a string literal, including the surrounding quotes.
    pub fn string_literal(self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        for ch in value.chars() {
            if ch == '\'' {
                out.push('\'');
            }
            if ch == '\\' && self == Dialect::Mysql {
                out.push('\\');
            }
            out.push(ch);
        }
        out.push('\'');
        out
    }

    /// Render a value as inline SQL text. `None` when the value has no literal form.
    pub fn literal(self, value: &Value) -> Option<String> {
        match value {
            Value::Null => Some("NULL".to_string()),
            Value::Bool(v) => Some(self.bool_literal(*v).to_string()),
            Value::Text(s) => Some(self.string_literal(s)),
            Value::Date(d) => Some(self.string_literal(&d.format("%Y-%m-%d").to_string())),
            Value::Time(t) => Some(self.string_literal(&t.format("%H:%M:%S%.f").to_string())),
            Value::DateTime(dt) => Some(
                self.string_literal(&dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            ),
            Value::Uuid(u) => Some(self.string_literal(&u.to_string())),
            Value::Json(j) => Some(self.string_literal(&j.to_string())),
            Value::Bytes(_) => None,
            other => other.numeric_text(),
        }
    }

    /// Maximum bound parameters per statement.
    pub fn max_parameters(self) -> usize {
        match self {
            Dialect::SqlServer => 2099,
            Dialect::Mysql => 65_535,
            Dialect::Sqlite => 999,
            Dialect::Firebird => 32_767,
        }
    }

    /// Maximum rows per bulk statement.
    pub fn max_bulk_rows(self) -> usize {
        match self {
            Dialect::SqlServer => 1000,
            Dialect::Mysql | Dialect::Sqlite => usize::MAX,
            Dialect::Firebird => 10_000,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting_per_dialect() {
        assert_eq!(Dialect::SqlServer.quote("TestTable"), "[TestTable]");
        assert_eq!(Dialect::Mysql.quote("t1.Name"), "`t1`.`Name`");
        assert_eq!(Dialect::Sqlite.quote("Name"), "\"Name\"");
        assert_eq!(Dialect::Firebird.quote("t.*"), "\"t\".*");
    }

    #[test]
    fn quote_escapes_closing_char() {
        assert_eq!(Dialect::SqlServer.quote_part("a]b"), "[a]]b]");
        assert_eq!(Dialect::Sqlite.quote_part("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn already_quoted_is_kept() {
        assert_eq!(Dialect::SqlServer.quote("[x]"), "[x]");
    }

    #[test]
    fn literals() {
        assert_eq!(Dialect::Mysql.literal(&Value::Text("O'Brien".into())).unwrap(), "'O''Brien'");
        assert_eq!(Dialect::Firebird.literal(&Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(Dialect::Sqlite.literal(&Value::Bool(true)).unwrap(), "1");
        assert_eq!(Dialect::Sqlite.literal(&Value::Int(-4)).unwrap(), "-4");
        assert!(Dialect::Sqlite.literal(&Value::Bytes(vec![1])).is_none());
    }
}
