//! Immutable SQL fragments with `?` placeholders.
//!
//! A [`SqlExpression`] pairs a template with an ordered parameter list. A
//! parameter is either a [`Value`] or another `SqlExpression`, so fragments can
//! be nested without rendering them early. Rendering happens once, at the top:
//! nested templates are spliced in place of their placeholder and the remaining
//! value placeholders are numbered left to right.
//!
//! ```ignore
//! use polyorm::{SqlExpression, ParamStyle};
//!
//! let col = SqlExpression::raw("[Name]");
//! let sub = SqlExpression::new("SUBSTRING(?,?,?)", vec![col.into(), 1.into(), 3.into()]);
//! let upper = SqlExpression::new("UPPER(?)", vec![sub.into()]);
//! assert_eq!(upper.to_string(), "UPPER(SUBSTRING([Name],?,?))");
//! assert_eq!(upper.render(ParamStyle::At).sql, "UPPER(SUBSTRING([Name],@p1,@p2))");
//! ```

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::fmt;

/// A parameter of a [`SqlExpression`].
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Value(Value),
    Expression(SqlExpression),
}

impl<T: Into<Value>> From<T> for SqlParam {
    fn from(value: T) -> Self {
        SqlParam::Value(value.into())
    }
}

impl From<SqlExpression> for SqlParam {
    fn from(expr: SqlExpression) -> Self {
        SqlParam::Expression(expr)
    }
}

/// How value placeholders are named when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// Keep `?`.
    Question,
    /// `@p1, @p2, ...`
    At,
    /// `:p1, :p2, ...` (Firebird block-local references)
    Colon,
}

impl ParamStyle {
    fn write(self, out: &mut String, idx: usize) {
        use std::fmt::Write;
        let _ = match self {
            ParamStyle::Question => write!(out, "?"),
            ParamStyle::At => write!(out, "@p{idx}"),
            ParamStyle::Colon => write!(out, ":p{idx}"),
        };
    }
}

/// Final statement text plus the values bound to it, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<Value>,
}

/// An immutable SQL template with ordered parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlExpression {
    template: String,
    params: Vec<SqlParam>,
    /// Byte offsets of the placeholders in `template`.
    slots: Vec<usize>,
}

/// One piece of a template: literal text or a placeholder's parameter.
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Param(&'a SqlParam),
}

impl SqlExpression {
    /// Create an expression. The number of `?` placeholders must match `params`.
    pub fn new(template: impl Into<String>, params: Vec<SqlParam>) -> Self {
        let template = template.into();
        let slots = placeholder_positions(&template);
        debug_assert_eq!(
            slots.len(),
            params.len(),
            "placeholder count mismatch in `{template}`"
        );
        Self {
            template,
            params,
            slots,
        }
    }

    /// Create an expression whose placeholder offsets are already known.
    ///
    /// Each offset must point at a `?` byte of `template`.
    pub(crate) fn from_slots(template: String, slots: Vec<usize>, params: Vec<SqlParam>) -> Self {
        debug_assert_eq!(slots.len(), params.len());
        debug_assert!(slots.iter().all(|&i| template.as_bytes().get(i) == Some(&b'?')));
        Self {
            template,
            params,
            slots,
        }
    }

    /// Create an expression, validating the placeholder count.
    pub fn try_new(template: impl Into<String>, params: Vec<SqlParam>) -> OrmResult<Self> {
        let template = template.into();
        let slots = placeholder_positions(&template);
        if slots.len() != params.len() {
            return Err(OrmError::validation(format!(
                "expression `{template}` has {} placeholders but {} parameters",
                slots.len(),
                params.len()
            )));
        }
        Ok(Self {
            template,
            params,
            slots,
        })
    }

    /// Create an expression from plain values.
    pub fn with_values<V: Into<Value>>(
        template: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            template,
            values
                .into_iter()
                .map(|v| SqlParam::Value(v.into()))
                .collect(),
        )
    }

    /// A parameter-free fragment. Its text is never scanned for placeholders.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::from_slots(text.into(), Vec::new(), Vec::new())
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }

    /// Join expressions with a separator, keeping them nested.
    pub fn join(parts: impl IntoIterator<Item = SqlExpression>, separator: &str) -> Self {
        let mut template = String::new();
        let mut params = Vec::new();
        let mut slots = Vec::new();
        for (i, part) in parts.into_iter().enumerate() {
            if i > 0 {
                template.push_str(separator);
            }
            slots.push(template.len());
            template.push('?');
            params.push(SqlParam::Expression(part));
        }
        Self {
            template,
            params,
            slots,
        }
    }

    /// Wrap this expression: `{prefix}?{suffix}`.
    pub fn wrap(self, prefix: &str, suffix: &str) -> Self {
        Self {
            template: format!("{prefix}?{suffix}"),
            params: vec![SqlParam::Expression(self)],
            slots: vec![prefix.len()],
        }
    }

    pub(crate) fn segments(&self) -> Vec<Segment<'_>> {
        let mut out = Vec::with_capacity(self.params.len() * 2 + 1);
        let mut last = 0;
        let mut params = self.params.iter();
        for &pos in &self.slots {
            if pos > last {
                out.push(Segment::Text(&self.template[last..pos]));
            }
            match params.next() {
                Some(p) => out.push(Segment::Param(p)),
                None => out.push(Segment::Text("?")),
            }
            last = pos + 1;
        }
        if last < self.template.len() {
            out.push(Segment::Text(&self.template[last..]));
        }
        out
    }

    fn write_flat(&self, out: &mut String, emit: &mut dyn FnMut(&mut String, &Value)) {
        for segment in self.segments() {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Param(SqlParam::Value(v)) => emit(out, v),
                Segment::Param(SqlParam::Expression(e)) => e.write_flat(out, emit),
            }
        }
    }

    /// Splice nested expressions so that every remaining parameter is a value.
    pub fn flatten(&self) -> SqlExpression {
        let mut template = String::with_capacity(self.template.len());
        let mut params = Vec::new();
        let mut slots = Vec::new();
        self.write_flat(&mut template, &mut |out, v| {
            slots.push(out.len());
            out.push('?');
            params.push(SqlParam::Value(v.clone()));
        });
        SqlExpression {
            template,
            params,
            slots,
        }
    }

    /// Flattened values in placeholder order.
    pub fn values(&self) -> Vec<Value> {
        let mut values = Vec::new();
        self.write_flat(&mut String::new(), &mut |_, v| values.push(v.clone()));
        values
    }

    /// Render with positional parameter names.
    pub fn render(&self, style: ParamStyle) -> RenderedSql {
        let mut sql = String::with_capacity(self.template.len());
        let mut params = Vec::new();
        self.write_flat(&mut sql, &mut |out, v| {
            params.push(v.clone());
            style.write(out, params.len());
        });
        RenderedSql { sql, params }
    }
}

impl fmt::Display for SqlExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::with_capacity(self.template.len());
        self.write_flat(&mut out, &mut |out, _| out.push('?'));
        f.write_str(&out)
    }
}

/// Byte offsets of `?` placeholders, skipping quoted literals and identifiers
/// (`'..'`, `".."`, `` `..` `` and `[..]`, each with its doubled-close escape).
pub(crate) fn placeholder_positions(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'?' => out.push(i),
            open @ (b'\'' | b'"' | b'`' | b'[') => {
                let close = if open == b'[' { b']' } else { open };
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == close {
                        if i + 1 < bytes.len() && bytes[i + 1] == close {
                            i += 1; // escaped quote
                        } else {
                            break;
                        }
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    out
}
