//! Mutable text + parameter accumulator used by grammars and callers.
//!
//! `QueryBuilder` stores SQL pieces and parameters separately, the final
//! [`SqlExpression`] gets one `?` per bound value. Values that have a plain
//! literal form (`NULL`, booleans, numbers) are written inline; everything else
//! is bound, unless the builder is in no-parameters mode (DDL) or string
//! escaping is enabled, in which case values are written as escaped literals.

use crate::config::QueryConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::expression::{Segment, SqlExpression, SqlParam};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Rewrites a value before it is bound.
pub type ParamInterceptor = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug, Clone)]
enum Part {
    Raw(String),
    Param,
}

/// Accumulates statement text and bound values.
#[derive(Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    parts: Vec<Part>,
    params: Vec<Value>,
    interceptor: Option<ParamInterceptor>,
    no_parameters: bool,
    escape_strings: bool,
}

impl QueryBuilder {
    /// Create a builder following a query config (dialect, escaping, date interception).
    pub fn new(config: &QueryConfig) -> Self {
        let interceptor: Option<ParamInterceptor> = config.date_format.as_ref().map(|_| {
            let config = config.clone();
            Arc::new(move |v| config.intercept(v)) as ParamInterceptor
        });
        Self {
            dialect: config.dialect,
            parts: Vec::new(),
            params: Vec::new(),
            interceptor,
            no_parameters: false,
            escape_strings: config.escape_strings,
        }
    }

    /// Create a bare builder for a dialect.
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            parts: Vec::new(),
            params: Vec::new(),
            interceptor: None,
            no_parameters: false,
            escape_strings: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Inline every value as a literal (DDL contexts).
    pub fn no_parameters(mut self) -> Self {
        self.no_parameters = true;
        self
    }

    pub fn set_no_parameters(&mut self, enabled: bool) -> &mut Self {
        self.no_parameters = enabled;
        self
    }

    pub fn with_interceptor(mut self, interceptor: ParamInterceptor) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Append raw SQL. The text must not contain placeholders.
    pub fn add(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(Part::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(Part::Raw(sql.to_string())),
        }
        self
    }

    /// Append a quoted identifier.
    pub fn add_quoted(&mut self, ident: &str) -> &mut Self {
        let quoted = self.dialect.quote(ident);
        self.add(&quoted)
    }

    /// Append a value: inline when it has a plain literal form, bound otherwise.
    pub fn add_value(&mut self, value: Value) -> OrmResult<&mut Self> {
        let value = match &self.interceptor {
            Some(intercept) => intercept(value),
            None => value,
        };

        match &value {
            Value::Null | Value::Bool(_) => {
                let literal = self.literal(&value)?;
                return Ok(self.add(&literal));
            }
            v if v.is_numeric() => {
                let literal = self.literal(&value)?;
                return Ok(self.add(&literal));
            }
            _ => {}
        }

        let inline = self.no_parameters || (self.escape_strings && matches!(value, Value::Text(_)));
        if inline {
            let literal = self.literal(&value)?;
            return Ok(self.add(&literal));
        }

        self.parts.push(Part::Param);
        self.params.push(value);
        Ok(self)
    }

    /// Append a value that is always bound, even numbers (Firebird block headers).
    pub fn add_bound(&mut self, value: Value) -> OrmResult<&mut Self> {
        let value = match &self.interceptor {
            Some(intercept) => intercept(value),
            None => value,
        };
        if self.no_parameters {
            let literal = self.literal(&value)?;
            return Ok(self.add(&literal));
        }
        self.parts.push(Part::Param);
        self.params.push(value);
        Ok(self)
    }

    /// Apply the interceptor, if any.
    pub(crate) fn intercept(&self, value: Value) -> Value {
        match &self.interceptor {
            Some(intercept) => intercept(value),
            None => value,
        }
    }

    /// Whether [`add_value`](Self::add_value) would bind `value` instead of inlining it.
    pub(crate) fn binds(&self, value: &Value) -> bool {
        if value.is_null() || matches!(value, Value::Bool(_)) || value.is_numeric() {
            return false;
        }
        !(self.no_parameters || (self.escape_strings && matches!(value, Value::Text(_))))
    }

    fn literal(&self, value: &Value) -> OrmResult<String> {
        self.dialect.literal(value).ok_or_else(|| {
            OrmError::validation(format!(
                "{} value cannot be written as a SQL literal",
                value.kind()
            ))
        })
    }

    /// Append an expression, splicing nested fragments in place.
    pub fn add_expression(&mut self, expr: &SqlExpression) -> OrmResult<&mut Self> {
        for segment in expr.segments() {
            match segment {
                Segment::Text(text) => {
                    self.add(text);
                }
                Segment::Param(SqlParam::Value(v)) => {
                    self.add_value(v.clone())?;
                }
                Segment::Param(SqlParam::Expression(e)) => {
                    self.add_expression(e)?;
                }
            }
        }
        Ok(self)
    }

    /// Append items separated by `separator`.
    pub fn add_join<T>(
        &mut self,
        items: impl IntoIterator<Item = T>,
        separator: &str,
        mut f: impl FnMut(&mut Self, T) -> OrmResult<()>,
    ) -> OrmResult<&mut Self> {
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                self.add(separator);
            }
            f(self, item)?;
        }
        Ok(self)
    }

    /// Append a comma-separated list of values.
    pub fn add_values(&mut self, values: impl IntoIterator<Item = Value>) -> OrmResult<&mut Self> {
        self.add_join(values, ", ", |b, v| b.add_value(v).map(|_| ()))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Number of bound values.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
        self.params.clear();
    }

    /// Build the accumulated text and values into one expression.
    ///
    /// Placeholder offsets come from the recorded parts, so quoted identifiers
    /// holding `'` or `?` never shift the parameters.
    pub fn to_expression(&self) -> SqlExpression {
        let mut text = String::new();
        let mut slots = Vec::with_capacity(self.params.len());
        for part in &self.parts {
            match part {
                Part::Raw(s) => text.push_str(s),
                Part::Param => {
                    slots.push(text.len());
                    text.push('?');
                }
            }
        }
        SqlExpression::from_slots(
            text,
            slots,
            self.params.iter().cloned().map(SqlParam::Value).collect(),
        )
    }

    fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Raw(s) => out.push_str(s),
                Part::Param => out.push('?'),
            }
        }
        out
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect)
            .field("sql", &self.text())
            .field("params", &self.params)
            .field("no_parameters", &self.no_parameters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ParamStyle;
    use chrono::NaiveDate;

    #[test]
    fn literals_are_inlined_strings_are_bound() {
        let mut b = QueryBuilder::for_dialect(Dialect::SqlServer);
        b.add("VALUES (");
        b.add_values([Value::Int(1), Value::Text("a".into()), Value::Null, Value::Bool(true)])
            .unwrap();
        b.add(")");
        let expr = b.to_expression();
        assert_eq!(expr.to_string(), "VALUES (1, ?, NULL, 1)");
        assert_eq!(expr.values(), vec![Value::Text("a".into())]);
    }

    #[test]
    fn no_parameters_mode_inlines_everything() {
        let mut b = QueryBuilder::for_dialect(Dialect::Mysql).no_parameters();
        b.add("DEFAULT ").add_value(Value::Text("it's".into())).unwrap();
        assert_eq!(b.to_string(), "DEFAULT 'it''s'");
        assert_eq!(b.param_count(), 0);
    }

    #[test]
    fn no_parameters_mode_rejects_bytes() {
        let mut b = QueryBuilder::for_dialect(Dialect::Mysql).no_parameters();
        let err = b.add_value(Value::Bytes(vec![0, 1])).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn escape_strings_inlines_text_only() {
        let config = QueryConfig::mysql().with_escape_strings(true);
        let mut b = QueryBuilder::new(&config);
        b.add_value(Value::Text("x".into())).unwrap();
        b.add(" ");
        b.add_value(Value::Bytes(vec![1])).unwrap();
        assert_eq!(b.to_string(), "'x' ?");
    }

    #[test]
    fn interceptor_formats_dates() {
        let dt = NaiveDate::from_ymd_opt(2023, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        let mut b = QueryBuilder::new(&QueryConfig::sqlite());
        b.add_value(Value::DateTime(dt)).unwrap();
        assert_eq!(b.to_expression().values(), vec![Value::Text("2023-05-06 07:08:09".into())]);
    }

    #[test]
    fn nested_expression_values_follow_builder_policy() {
        let sub = SqlExpression::new(
            "SUBSTRING(?,?,?)",
            vec![SqlExpression::raw("[Name]").into(), 1.into(), 3.into()],
        );
        let mut b = QueryBuilder::for_dialect(Dialect::SqlServer);
        b.add("SELECT ").add_expression(&sub).unwrap();
        assert_eq!(b.to_string(), "SELECT SUBSTRING([Name],1,3)");
        assert_eq!(b.param_count(), 0);
    }

    #[test]
    fn quoted_identifiers_never_shift_parameters() {
        let mut b = QueryBuilder::for_dialect(Dialect::SqlServer);
        b.add_quoted("O'Brien").add(" = ");
        b.add_value(Value::Text("x".into())).unwrap();
        b.add(" AND ").add_quoted("a?b").add(" = ");
        b.add_value(Value::Text("y".into())).unwrap();
        let rendered = b.to_expression().render(ParamStyle::At);
        assert_eq!(rendered.sql, "[O'Brien] = @p1 AND [a?b] = @p2");
        assert_eq!(
            rendered.params,
            vec![Value::Text("x".into()), Value::Text("y".into())]
        );
    }

    #[test]
    fn to_expression_is_idempotent() {
        let mut b = QueryBuilder::for_dialect(Dialect::Sqlite);
        b.add("a = ").add_value(Value::Text("x".into())).unwrap();
        let first = b.to_expression();
        let second = b.to_expression();
        assert_eq!(first, second);
        assert_eq!(first.render(ParamStyle::At).sql, "a = @p1");
    }
}
