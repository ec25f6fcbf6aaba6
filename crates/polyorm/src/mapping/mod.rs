//! Result mapping: entity metadata, readers and object construction.
//!
//! An [`Entity`] describes itself once through a [`TableInfo`]; the same
//! metadata turns an instance into a [`Row`] for writes and a result row back
//! into an instance.
//!
//! ```ignore
//! #[derive(Default)]
//! struct User { id: i64, name: String }
//!
//! impl Entity for User {
//!     fn table_info() -> TableInfo<Self> {
//!         TableInfo::builder("Users")
//!             .identity("Id", |u: &User| u.id, |u, v| u.id = v)
//!             .column("Name", |u: &User| u.name.clone(), |u, v| u.name = v)
//!             .with_default()
//!             .build()
//!     }
//! }
//!
//! let users: Vec<User> = MappedObject::new().read_all(reader, None)?;
//! ```

mod activator;
mod mapped;
mod reader;
mod table_info;

#[cfg(test)]
mod tests;

pub use activator::ObjectActivator;
pub use mapped::{FkQueue, ForeignInfo, ForeignRequest, MappedObject};
pub use reader::{DataReader, MemoryReader, RowReader};
pub use table_info::{
    ColumnInfo, Constructor, ForeignKind, ForeignMember, TableInfo, TableInfoBuilder,
};

use crate::error::OrmResult;
use crate::row::Row;

/// A type with table metadata.
pub trait Entity: Sized + Send + Sync + 'static {
    fn table_info() -> TableInfo<Self>;
}

/// Hand-written mapping of a result row.
///
/// For one-off projections that do not warrant a [`TableInfo`].
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}
