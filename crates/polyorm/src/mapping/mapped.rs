use super::{DataReader, Entity, ForeignKind, ObjectActivator, RowReader, TableInfo};
use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::value::Value;
use std::sync::Arc;

/// A foreign member waiting to be loaded: which owner, which member, and the
/// raw key value read from the owner's row.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignInfo {
    /// Index of the owner in the batch being read.
    pub owner: usize,
    /// Index into [`TableInfo::foreign`].
    pub member: usize,
    pub key: Value,
}

/// What an [`FkQueue`] is asked to load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForeignRequest<'a> {
    pub table: &'a str,
    pub column: &'a str,
    pub key: &'a Value,
    pub kind: ForeignKind,
}

/// Loads the rows of a foreign member.
pub trait FkQueue {
    /// Rows of `request.table` whose `request.column` equals `request.key`.
    fn load(&mut self, request: &ForeignRequest<'_>) -> OrmResult<Vec<Row>>;
}

/// Index of a reader column and the entity column it feeds.
#[derive(Debug, Clone)]
struct Layout {
    width: usize,
    natives: Vec<(usize, usize)>,
    foreign: Vec<(usize, usize)>,
}

/// Maps result rows onto entities of type `T`.
///
/// Reading is two-pass per row: native columns are set first and foreign
/// members are returned as [`ForeignInfo`]s, which
/// [`resolve`](Self::resolve) later loads through an [`FkQueue`].
///
/// The column layout is computed from the first row and reused; later rows
/// only have their width checked.
#[derive(Debug)]
pub struct MappedObject<T> {
    info: Arc<TableInfo<T>>,
    activator: ObjectActivator<T>,
    layout: Option<Layout>,
}

impl<T: Entity> MappedObject<T> {
    pub fn new() -> Self {
        Self::with_info(TableInfo::of())
    }
}

impl<T: Entity> Default for MappedObject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> MappedObject<T> {
    pub fn with_info(info: Arc<TableInfo<T>>) -> Self {
        Self {
            activator: ObjectActivator::new(Arc::clone(&info)),
            info,
            layout: None,
        }
    }

    pub fn info(&self) -> &TableInfo<T> {
        &self.info
    }

    fn layout(&mut self, row: &Row) -> OrmResult<Layout> {
        if let Some(layout) = &self.layout {
            if row.len() != layout.width {
                return Err(OrmError::decode(
                    "row",
                    format!("expected {} columns, got {}", layout.width, row.len()),
                ));
            }
            return Ok(layout.clone());
        }

        let names: Vec<String> = row.names().map(str::to_string).collect();
        self.activator.prepare(&names)?;
        let consumed = self.activator.consumed();
        let position = |name: &str| names.iter().position(|n| n.eq_ignore_ascii_case(name));

        let natives = self
            .info
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !consumed.iter().any(|p| p.eq_ignore_ascii_case(c.name())))
            .filter_map(|(ci, c)| position(c.name()).map(|ri| (ri, ci)))
            .collect();
        let foreign = self
            .info
            .foreign()
            .iter()
            .enumerate()
            .filter_map(|(fi, f)| position(f.source_column()).map(|ri| (ri, fi)))
            .collect();

        let layout = Layout {
            width: names.len(),
            natives,
            foreign,
        };
        self.layout = Some(layout.clone());
        Ok(layout)
    }

    /// Build one entity from `row`. Foreign members come back unresolved,
    /// with `owner` set to 0.
    pub fn read(&mut self, row: &Row) -> OrmResult<(T, Vec<ForeignInfo>)> {
        let layout = self.layout(row)?;
        let mut entity = self.activator.create(row)?;
        let value_at = |i: usize| {
            row.cells()
                .get(i)
                .and_then(|cell| cell.value().cloned())
                .unwrap_or(Value::Null)
        };

        for &(ri, ci) in &layout.natives {
            if let Some(column) = self.info.columns().get(ci) {
                column.assign(&mut entity, value_at(ri))?;
            }
        }

        let pending = layout
            .foreign
            .iter()
            .map(|&(ri, fi)| ForeignInfo {
                owner: 0,
                member: fi,
                key: value_at(ri),
            })
            .filter(|info| !info.key.is_null())
            .collect();
        Ok((entity, pending))
    }

    /// Load every pending foreign member and attach it to its owner.
    pub fn resolve(
        &self,
        entities: &mut [T],
        pending: Vec<ForeignInfo>,
        queue: &mut dyn FkQueue,
    ) -> OrmResult<()> {
        for info in pending {
            let Some(member) = self.info.foreign().get(info.member) else {
                continue;
            };
            let Some(owner) = entities.get_mut(info.owner) else {
                continue;
            };
            let (table, column) = member.target();
            if column.is_empty() {
                return Err(OrmError::validation(format!(
                    "foreign member {} targets table {table} without a key column",
                    member.member()
                )));
            }
            let rows = queue.load(&ForeignRequest {
                table: &table,
                column: &column,
                key: &info.key,
                kind: member.kind(),
            })?;
            member.assign(owner, rows)?;
        }
        Ok(())
    }

    /// Read every row of `reader`, then resolve foreign members when a queue
    /// is given.
    pub fn read_all<R: DataReader>(
        &mut self,
        reader: R,
        queue: Option<&mut dyn FkQueue>,
    ) -> OrmResult<Vec<T>> {
        let mut entities = Vec::new();
        let mut pending = Vec::new();
        for row in RowReader::new(reader) {
            let (entity, foreign) = self.read(&row?)?;
            let owner = entities.len();
            pending.extend(foreign.into_iter().map(|info| ForeignInfo { owner, ..info }));
            entities.push(entity);
        }
        if let Some(queue) = queue {
            self.resolve(&mut entities, pending, queue)?;
        }
        Ok(entities)
    }
}
