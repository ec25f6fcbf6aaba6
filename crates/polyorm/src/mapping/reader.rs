use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::collections::VecDeque;

/// Forward-only cursor over a result set.
pub trait DataReader {
    /// Column names of the result set, in order.
    fn columns(&self) -> &[String];

    /// The next row's values, `None` once exhausted.
    fn next_values(&mut self) -> OrmResult<Option<Vec<Value>>>;
}

impl<R: DataReader + ?Sized> DataReader for Box<R> {
    fn columns(&self) -> &[String] {
        (**self).columns()
    }

    fn next_values(&mut self) -> OrmResult<Option<Vec<Value>>> {
        (**self).next_values()
    }
}

impl<R: DataReader + ?Sized> DataReader for &mut R {
    fn columns(&self) -> &[String] {
        (**self).columns()
    }

    fn next_values(&mut self) -> OrmResult<Option<Vec<Value>>> {
        (**self).next_values()
    }
}

/// A [`DataReader`] over rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

impl MemoryReader {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: VecDeque::new(),
        }
    }

    pub fn with_row(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.rows.push_back(values.into_iter().collect());
        self
    }

    pub fn push_row(&mut self, values: Vec<Value>) {
        self.rows.push_back(values);
    }

    /// Column names come from the first row.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.names().map(str::to_string).collect())
            .unwrap_or_default();
        let rows = rows
            .into_iter()
            .map(|row| {
                row.cells()
                    .iter()
                    .map(|cell| cell.value().cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Rows not read yet.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl DataReader for MemoryReader {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_values(&mut self) -> OrmResult<Option<Vec<Value>>> {
        Ok(self.rows.pop_front())
    }
}

/// Turns a [`DataReader`] into [`Row`]s.
///
/// Column names are captured once; every row must carry the same number of
/// values, a mismatch is a decode error.
#[derive(Debug)]
pub struct RowReader<R> {
    reader: R,
    names: Vec<String>,
}

impl<R: DataReader> RowReader<R> {
    pub fn new(reader: R) -> Self {
        let names = reader.columns().to_vec();
        Self { reader, names }
    }

    pub fn columns(&self) -> &[String] {
        &self.names
    }

    pub fn next_row(&mut self) -> OrmResult<Option<Row>> {
        let Some(values) = self.reader.next_values()? else {
            return Ok(None);
        };
        if values.len() != self.names.len() {
            return Err(OrmError::decode(
                "row",
                format!(
                    "expected {} values, got {}",
                    self.names.len(),
                    values.len()
                ),
            ));
        }
        Ok(Some(Row::from_values(&self.names, values)))
    }

    pub fn read_all(mut self) -> OrmResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: DataReader> Iterator for RowReader<R> {
    type Item = OrmResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}
