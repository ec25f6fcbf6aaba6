//! Ordered `(name, value)` tuples used for INSERT/UPDATE payloads and SELECT results.

use crate::error::{OrmError, OrmResult};
use crate::expression::{SqlExpression, SqlParam};
use crate::value::{FromValue, Value};

/// One named value. Cells built for writes may carry a raw expression instead of a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub name: String,
    pub value: SqlParam,
}

impl Cell {
    pub fn new(name: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A cell whose value is written as raw SQL (`NOW()`, `[Count] + 1`).
    pub fn raw(name: impl Into<String>, expr: SqlExpression) -> Self {
        Self {
            name: name.into(),
            value: SqlParam::Expression(expr),
        }
    }

    /// The plain value, `None` for expression cells.
    pub fn value(&self) -> Option<&Value> {
        match &self.value {
            SqlParam::Value(v) => Some(v),
            SqlParam::Expression(_) => None,
        }
    }
}

/// An ordered sequence of cells.
///
/// Column names are expected to be unique; lookups are case-insensitive and
/// return the first match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cell (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlParam>) -> Self {
        self.cells.push(Cell::new(name, value));
        self
    }

    pub fn push(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Build a result row from reader column names and values.
    pub fn from_values(names: &[String], values: Vec<Value>) -> Self {
        Self {
            cells: names
                .iter()
                .zip(values)
                .map(|(name, value)| Cell::new(name.clone(), SqlParam::Value(value)))
                .collect(),
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|c| c.name.as_str())
    }

    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Plain value of a column.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.cell(name).and_then(Cell::value)
    }

    /// Decode a column into a Rust type.
    pub fn get<T: FromValue>(&self, name: &str) -> OrmResult<T> {
        let value = self
            .value(name)
            .cloned()
            .ok_or_else(|| OrmError::decode(name, "column not found"))?;
        T::from_value(value).map_err(|e| OrmError::decode(name, e.to_string()))
    }

    /// Keep only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Row {
        Row {
            cells: names
                .iter()
                .filter_map(|n| self.cell(n).cloned())
                .collect(),
        }
    }

    /// True when `other` has the same column names in the same order.
    pub fn same_shape(&self, other: &Row) -> bool {
        self.cells.len() == other.cells.len()
            && self
                .cells
                .iter()
                .zip(&other.cells)
                .all(|(a, b)| a.name.eq_ignore_ascii_case(&b.name))
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Row {
    type Item = Cell;
    type IntoIter = std::vec::IntoIter<Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.into_iter()
    }
}

impl<'a> IntoIterator for &'a Row {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let row = Row::new().with("Id", 1).with("Name", "a");
        assert_eq!(row.value("name"), Some(&Value::Text("a".into())));
        assert_eq!(row.get::<i64>("ID").unwrap(), 1);
    }

    #[test]
    fn missing_column_is_decode_error() {
        let row = Row::new().with("Id", 1);
        let err = row.get::<String>("Name").unwrap_err();
        assert!(matches!(err, OrmError::Decode { .. }));
    }

    #[test]
    fn expression_cells_have_no_plain_value() {
        let row = Row::new().with("Updated", SqlExpression::raw("GETDATE()"));
        assert!(row.value("Updated").is_none());
        assert!(row.cell("Updated").is_some());
    }

    #[test]
    fn shape_compares_names_in_order() {
        let a = Row::new().with("a", 1).with("b", 2);
        let b = Row::new().with("A", 3).with("B", 4);
        let c = Row::new().with("b", 1).with("a", 2);
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }
}
