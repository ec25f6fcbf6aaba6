//! WHERE / HAVING / JOIN ON condition trees.
//!
//! Conditions are dialect-neutral until [`Condition::build`] writes them into a
//! [`QueryBuilder`], which quotes identifiers and binds values for the active
//! dialect. `= NULL` comparisons are rewritten to `IS NULL`, and empty `IN`
//! lists collapse to constant predicates so the statement stays valid.

use crate::builder::QueryBuilder;
use crate::error::OrmResult;
use crate::expression::SqlExpression;
use crate::member::SqlMember;
use crate::methods::SqlMethodRegistry;
use crate::query::QueryInfoView;
use crate::value::Value;

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Value(Value),
    Expression(SqlExpression),
    Member(SqlMember),
}

impl Operand {
    fn write(&self, b: &mut QueryBuilder, info: &dyn QueryInfoView) -> OrmResult<()> {
        match self {
            Operand::Column(name) => {
                b.add_quoted(name);
            }
            Operand::Value(v) => {
                b.add_value(v.clone())?;
            }
            Operand::Expression(e) => {
                b.add_expression(e)?;
            }
            Operand::Member(member) => {
                let expr = SqlMethodRegistry::shared(info.config().dialect).apply_member(
                    info,
                    member,
                    info.has_joins(),
                )?;
                b.add_expression(&expr)?;
            }
        }
        Ok(())
    }

    fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Column(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Column(name)
    }
}

impl From<SqlExpression> for Operand {
    fn from(expr: SqlExpression) -> Self {
        Operand::Expression(expr)
    }
}

impl From<SqlMember> for Operand {
    fn from(member: SqlMember) -> Self {
        Operand::Member(member)
    }
}

/// Condition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    /// `left op right`
    Compare {
        left: Operand,
        op: &'static str,
        right: Operand,
    },
    NullCheck {
        operand: Operand,
        is_null: bool,
    },
    InList {
        operand: Operand,
        values: Vec<Value>,
        negated: bool,
    },
    /// `operand [NOT] IN (subquery)`
    InExpression {
        operand: Operand,
        expr: SqlExpression,
        negated: bool,
    },
    Between {
        operand: Operand,
        from: Value,
        to: Value,
        negated: bool,
    },
    /// Raw SQL predicate with `?` placeholders.
    Expression(SqlExpression),
    True,
    False,
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// `left op value`
    pub fn compare(left: impl Into<Operand>, op: &'static str, value: impl Into<Value>) -> Self {
        Condition::Compare {
            left: left.into(),
            op,
            right: Operand::Value(value.into()),
        }
    }

    pub fn eq(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, "=", value)
    }

    pub fn ne(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, "!=", value)
    }

    pub fn gt(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, ">", value)
    }

    pub fn gte(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, ">=", value)
    }

    pub fn lt(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, "<", value)
    }

    pub fn lte(left: impl Into<Operand>, value: impl Into<Value>) -> Self {
        Self::compare(left, "<=", value)
    }

    pub fn like(left: impl Into<Operand>, pattern: impl Into<Value>) -> Self {
        Self::compare(left, "LIKE", pattern)
    }

    pub fn not_like(left: impl Into<Operand>, pattern: impl Into<Value>) -> Self {
        Self::compare(left, "NOT LIKE", pattern)
    }

    /// Column-to-column comparison (`[t2].[Id] = [t1].[T2Id]`).
    pub fn columns(left: impl Into<String>, op: &'static str, right: impl Into<String>) -> Self {
        Condition::Compare {
            left: Operand::Column(left.into()),
            op,
            right: Operand::Column(right.into()),
        }
    }

    pub fn is_null(operand: impl Into<Operand>) -> Self {
        Condition::NullCheck {
            operand: operand.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(operand: impl Into<Operand>) -> Self {
        Condition::NullCheck {
            operand: operand.into(),
            is_null: false,
        }
    }

    pub fn in_list<V: Into<Value>>(
        operand: impl Into<Operand>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Condition::False;
        }
        Condition::InList {
            operand: operand.into(),
            values,
            negated: false,
        }
    }

    pub fn not_in<V: Into<Value>>(
        operand: impl Into<Operand>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Condition::True;
        }
        Condition::InList {
            operand: operand.into(),
            values,
            negated: true,
        }
    }

    pub fn in_expression(operand: impl Into<Operand>, expr: SqlExpression) -> Self {
        Condition::InExpression {
            operand: operand.into(),
            expr,
            negated: false,
        }
    }

    pub fn between(
        operand: impl Into<Operand>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            operand: operand.into(),
            from: from.into(),
            to: to.into(),
            negated: false,
        }
    }

    pub fn not_between(
        operand: impl Into<Operand>,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            operand: operand.into(),
            from: from.into(),
            to: to.into(),
            negated: true,
        }
    }

    pub fn expr(expr: SqlExpression) -> Self {
        Condition::Expression(expr)
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Expression(SqlExpression::raw(sql))
    }

    /// True when the node renders no text.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::And(items) | Condition::Or(items) => items.iter().all(Condition::is_empty),
            Condition::Not(inner) => inner.is_empty(),
            Condition::Expression(e) => e.is_empty(),
            _ => false,
        }
    }

    fn needs_parens(&self) -> bool {
        match self {
            Condition::And(items) | Condition::Or(items) => {
                items.iter().filter(|c| !c.is_empty()).count() > 1
            }
            _ => false,
        }
    }

    /// Write the condition into `b`.
    pub fn build(&self, b: &mut QueryBuilder, info: &dyn QueryInfoView) -> OrmResult<()> {
        match self {
            Condition::And(items) => Self::build_list(items, " AND ", b, info),
            Condition::Or(items) => Self::build_list(items, " OR ", b, info),
            Condition::Not(inner) => {
                if inner.is_empty() {
                    return Ok(());
                }
                b.add("NOT (");
                inner.build(b, info)?;
                b.add(")");
                Ok(())
            }
            Condition::Compare { left, op, right } => {
                if right.is_null() && matches!(*op, "=" | "!=" | "<>") {
                    left.write(b, info)?;
                    b.add(if *op == "=" { " IS NULL" } else { " IS NOT NULL" });
                    return Ok(());
                }
                left.write(b, info)?;
                b.add(" ").add(op).add(" ");
                right.write(b, info)
            }
            Condition::NullCheck { operand, is_null } => {
                operand.write(b, info)?;
                b.add(if *is_null { " IS NULL" } else { " IS NOT NULL" });
                Ok(())
            }
            Condition::InList {
                operand,
                values,
                negated,
            } => {
                if values.is_empty() {
                    b.add(if *negated { "1=1" } else { "1=0" });
                    return Ok(());
                }
                operand.write(b, info)?;
                b.add(if *negated { " NOT IN (" } else { " IN (" });
                b.add_values(values.iter().cloned())?;
                b.add(")");
                Ok(())
            }
            Condition::InExpression {
                operand,
                expr,
                negated,
            } => {
                operand.write(b, info)?;
                b.add(if *negated { " NOT IN (" } else { " IN (" });
                b.add_expression(expr)?;
                b.add(")");
                Ok(())
            }
            Condition::Between {
                operand,
                from,
                to,
                negated,
            } => {
                operand.write(b, info)?;
                b.add(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
                b.add_value(from.clone())?;
                b.add(" AND ");
                b.add_value(to.clone())?;
                Ok(())
            }
            Condition::Expression(e) => {
                b.add_expression(e)?;
                Ok(())
            }
            Condition::True => {
                b.add("1=1");
                Ok(())
            }
            Condition::False => {
                b.add("1=0");
                Ok(())
            }
        }
    }

    fn build_list(
        items: &[Condition],
        separator: &str,
        b: &mut QueryBuilder,
        info: &dyn QueryInfoView,
    ) -> OrmResult<()> {
        let items = items.iter().filter(|c| !c.is_empty());
        b.add_join(items, separator, |b, c| {
            if c.needs_parens() {
                b.add("(");
                c.build(b, info)?;
                b.add(")");
                Ok(())
            } else {
                c.build(b, info)
            }
        })?;
        Ok(())
    }
}

/// How an item joins the previous one in a [`ConditionGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

/// A flat list of conditions joined left to right with AND / OR.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionGroup {
    items: Vec<(Logic, Condition)>,
}

impl ConditionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|(_, c)| c.is_empty())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add a condition joined with AND.
    pub fn and(&mut self, condition: Condition) -> &mut Self {
        self.items.push((Logic::And, condition));
        self
    }

    /// Add a condition joined with OR.
    pub fn or(&mut self, condition: Condition) -> &mut Self {
        self.items.push((Logic::Or, condition));
        self
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn build(&self, b: &mut QueryBuilder, info: &dyn QueryInfoView) -> OrmResult<()> {
        let mut first = true;
        for (logic, condition) in self.items.iter().filter(|(_, c)| !c.is_empty()) {
            if !first {
                b.add(match logic {
                    Logic::And => " AND ",
                    Logic::Or => " OR ",
                });
            }
            first = false;
            if condition.needs_parens() {
                b.add("(");
                condition.build(b, info)?;
                b.add(")");
            } else {
                condition.build(b, info)?;
            }
        }
        Ok(())
    }
}
