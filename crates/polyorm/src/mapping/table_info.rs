use super::{Entity, MappedObject};
use crate::config::Nomenclature;
use crate::error::{OrmError, OrmResult};
use crate::row::{Cell, Row};
use crate::value::{FromValue, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};

type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;
type Setter<T> = Arc<dyn Fn(&mut T, Value) -> OrmResult<()> + Send + Sync>;
type Assign<T> = Arc<dyn Fn(&mut T, Vec<Row>) -> OrmResult<()> + Send + Sync>;
type Build<T> = Arc<dyn Fn(&Row) -> OrmResult<T> + Send + Sync>;
type Locate = Arc<dyn Fn() -> (String, String) + Send + Sync>;

/// A mapped column: table column name plus accessors on the entity.
pub struct ColumnInfo<T> {
    name: String,
    member: String,
    key: bool,
    generated: bool,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> ColumnInfo<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member path on the entity (`Address.City` for nested members).
    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn is_key(&self) -> bool {
        self.key
    }

    /// Filled by the database (identity / autoincrement); skipped on insert.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    pub fn value_of(&self, entity: &T) -> Value {
        (self.get)(entity)
    }

    pub fn assign(&self, entity: &mut T, value: Value) -> OrmResult<()> {
        (self.set)(entity, value)
    }
}

impl<T> Clone for ColumnInfo<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            member: self.member.clone(),
            key: self.key,
            generated: self.generated,
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<T> fmt::Debug for ColumnInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnInfo")
            .field("name", &self.name)
            .field("member", &self.member)
            .field("key", &self.key)
            .field("generated", &self.generated)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKind {
    /// `Option<F>` loaded through a foreign key column of the owner.
    BelongsTo,
    /// `Vec<F>` loaded through a column of the child table that holds the owner's key.
    HasMany,
}

/// A member filled from another table after the owner's own columns are set.
pub struct ForeignMember<T> {
    member: String,
    kind: ForeignKind,
    source_column: String,
    locate: Locate,
    key_of: Getter<T>,
    assign: Assign<T>,
}

impl<T> ForeignMember<T> {
    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn kind(&self) -> ForeignKind {
        self.kind
    }

    /// Owner column whose value identifies the foreign rows.
    pub fn source_column(&self) -> &str {
        &self.source_column
    }

    /// The foreign table and its column matched against the source value.
    ///
    /// Resolved on use, so an entity may refer to itself.
    pub fn target(&self) -> (String, String) {
        (self.locate)()
    }

    /// BelongsTo: the key of the attached object, `Null` when none.
    pub fn key_of(&self, entity: &T) -> Value {
        (self.key_of)(entity)
    }

    /// Map `rows` with the foreign type's metadata and attach them to `entity`.
    pub fn assign(&self, entity: &mut T, rows: Vec<Row>) -> OrmResult<()> {
        (self.assign)(entity, rows)
    }
}

impl<T> fmt::Debug for ForeignMember<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignMember")
            .field("member", &self.member)
            .field("kind", &self.kind)
            .field("source_column", &self.source_column)
            .finish()
    }
}

/// A constructor taking the listed columns.
pub struct Constructor<T> {
    params: Vec<String>,
    build: Build<T>,
}

impl<T> Constructor<T> {
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Call the constructor with a row holding (at least) its parameters.
    pub fn call(&self, row: &Row) -> OrmResult<T> {
        (self.build)(row)
    }
}

/// Entity metadata: table name, mapped columns, foreign members and how to
/// construct an instance.
pub struct TableInfo<T> {
    table: String,
    columns: Vec<ColumnInfo<T>>,
    foreign: Vec<ForeignMember<T>>,
    constructors: Vec<Constructor<T>>,
    default: Option<Arc<dyn Fn() -> T + Send + Sync>>,
}

impl<T> fmt::Debug for TableInfo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableInfo")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("foreign", &self.foreign)
            .field("constructors", &self.constructors.len())
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

type Registry = RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

impl<T: Send + Sync + 'static> TableInfo<T> {
    pub fn builder(table: impl Into<String>) -> TableInfoBuilder<T> {
        TableInfoBuilder {
            info: TableInfo {
                table: table.into(),
                columns: Vec::new(),
                foreign: Vec::new(),
                constructors: Vec::new(),
                default: None,
            },
            nomenclature: Nomenclature::AsIs,
        }
    }

    /// Cached metadata of an entity type, built once per process.
    pub fn of() -> Arc<TableInfo<T>>
    where
        T: Entity,
    {
        let id = TypeId::of::<T>();
        if let Ok(cache) = registry().read() {
            if let Some(info) = cache.get(&id).and_then(|any| Arc::clone(any).downcast().ok()) {
                return info;
            }
        }

        // Built outside the lock: nested and foreign members look up their own metadata.
        let info = Arc::new(T::table_info());
        match registry().write() {
            Ok(mut cache) => {
                let entry = cache
                    .entry(id)
                    .or_insert_with(|| Arc::clone(&info) as Arc<dyn Any + Send + Sync>);
                Arc::clone(entry).downcast().unwrap_or(info)
            }
            Err(_) => info,
        }
    }

    pub fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T> TableInfo<T> {
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnInfo<T>] {
        &self.columns
    }

    pub fn foreign(&self) -> &[ForeignMember<T>] {
        &self.foreign
    }

    pub fn constructors(&self) -> &[Constructor<T>] {
        &self.constructors
    }

    pub(crate) fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub(crate) fn make_default(&self) -> Option<T> {
        self.default.as_ref().map(|make| make())
    }

    /// Column by name, case-insensitive.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo<T>> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnInfo<T>> {
        self.columns.iter().filter(|c| c.key)
    }

    /// The first key column.
    pub fn key_column(&self) -> Option<&str> {
        self.key_columns().next().map(ColumnInfo::name)
    }

    /// All column names, foreign key columns included.
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.name.clone())
            .chain(
                self.foreign
                    .iter()
                    .filter(|f| f.kind == ForeignKind::BelongsTo)
                    .map(|f| f.source_column.clone()),
            )
            .collect()
    }

    /// Every column of `entity`, foreign objects contributing their key.
    pub fn row_of(&self, entity: &T) -> Row {
        let mut row: Row = self
            .columns
            .iter()
            .map(|c| Cell::new(c.name.clone(), c.value_of(entity)))
            .collect();
        for foreign in self.foreign.iter().filter(|f| f.kind == ForeignKind::BelongsTo) {
            if row.cell(&foreign.source_column).is_none() {
                row.push(Cell::new(foreign.source_column.clone(), foreign.key_of(entity)));
            }
        }
        row
    }

    /// [`row_of`](Self::row_of) without generated columns.
    pub fn insert_row_of(&self, entity: &T) -> Row {
        let generated: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.generated)
            .map(ColumnInfo::name)
            .collect();
        self.row_of(entity)
            .into_iter()
            .filter(|cell| !generated.iter().any(|g| g.eq_ignore_ascii_case(&cell.name)))
            .collect()
    }

    /// [`row_of`](Self::row_of) without key and generated columns, for UPDATE.
    pub fn update_row_of(&self, entity: &T) -> Row {
        let skipped: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.key || c.generated)
            .map(ColumnInfo::name)
            .collect();
        self.row_of(entity)
            .into_iter()
            .filter(|cell| !skipped.iter().any(|s| s.eq_ignore_ascii_case(&cell.name)))
            .collect()
    }

    /// `(column, value)` of every key column.
    pub fn key_values(&self, entity: &T) -> OrmResult<Vec<(String, Value)>> {
        let keys: Vec<(String, Value)> = self
            .key_columns()
            .map(|c| (c.name.clone(), c.value_of(entity)))
            .collect();
        if keys.is_empty() {
            return Err(OrmError::validation(format!(
                "table {} has no key column",
                self.table
            )));
        }
        Ok(keys)
    }
}

/// Typed builder for [`TableInfo`].
///
/// ```ignore
/// impl Entity for Order {
///     fn table_info() -> TableInfo<Self> {
///         TableInfo::builder("Orders")
///             .identity("Id", |o: &Order| o.id, |o, v| o.id = v)
///             .column("Total", |o: &Order| o.total, |o, v| o.total = v)
///             .foreign("Customer", "CustomerId", |o: &Order| o.customer.as_ref(), |o, c| {
///                 o.customer = c
///             })
///             .with_default()
///             .build()
///     }
/// }
/// ```
pub struct TableInfoBuilder<T> {
    info: TableInfo<T>,
    nomenclature: Nomenclature,
}

impl<T: Send + Sync + 'static> TableInfoBuilder<T> {
    /// Naming convention for columns derived from member names.
    pub fn nomenclature(mut self, nomenclature: Nomenclature) -> Self {
        self.nomenclature = nomenclature;
        self
    }

    fn push_column<V>(
        mut self,
        member: &str,
        name: String,
        key: bool,
        generated: bool,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Value> + FromValue + 'static,
    {
        let column = name.clone();
        self.info.columns.push(ColumnInfo {
            name,
            member: member.to_string(),
            key,
            generated,
            get: Arc::new(move |entity| get(entity).into()),
            set: Arc::new(move |entity, value| {
                let value = V::from_value(value)
                    .map_err(|e| OrmError::decode(column.clone(), e.to_string()))?;
                set(entity, value);
                Ok(())
            }),
        });
        self
    }

    /// A column named after `member` (with the nomenclature applied).
    pub fn column<V>(
        self,
        member: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Value> + FromValue + 'static,
    {
        let name = self.nomenclature.apply(member);
        self.push_column(member, name, false, false, get, set)
    }

    /// A column with an explicit name. The nomenclature does not apply.
    pub fn column_named<V>(
        self,
        member: &str,
        name: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Value> + FromValue + 'static,
    {
        self.push_column(member, name.to_string(), false, false, get, set)
    }

    /// A key column supplied by the application.
    pub fn key<V>(
        self,
        member: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Value> + FromValue + 'static,
    {
        let name = self.nomenclature.apply(member);
        self.push_column(member, name, true, false, get, set)
    }

    /// A key column generated by the database.
    pub fn identity<V>(
        self,
        member: &str,
        get: impl Fn(&T) -> V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        V: Into<Value> + FromValue + 'static,
    {
        let name = self.nomenclature.apply(member);
        self.push_column(member, name, true, true, get, set)
    }

    /// Flatten the columns of a value object into this table, each named
    /// `prefix + column`.
    pub fn nested<N: Entity>(
        mut self,
        member: &str,
        prefix: &str,
        get: impl Fn(&T) -> &N + Send + Sync + 'static,
        get_mut: impl Fn(&mut T) -> &mut N + Send + Sync + 'static,
    ) -> Self {
        let nested = TableInfo::<N>::of();
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);
        for inner in nested.columns() {
            let (read, write) = (inner.get.clone(), inner.set.clone());
            let (get, get_mut) = (Arc::clone(&get), Arc::clone(&get_mut));
            self.info.columns.push(ColumnInfo {
                name: format!("{prefix}{}", inner.name),
                member: format!("{member}.{}", inner.member),
                key: false,
                generated: false,
                get: Arc::new(move |entity| read(get(entity))),
                set: Arc::new(move |entity, value| write(get_mut(entity), value)),
            });
        }
        self
    }

    /// A `belongs to` member: `fk_column` of this table holds the key of `F`.
    pub fn foreign<F: Entity>(
        mut self,
        member: &str,
        fk_column: &str,
        get: impl Fn(&T) -> Option<&F> + Send + Sync + 'static,
        set: impl Fn(&mut T, Option<F>) + Send + Sync + 'static,
    ) -> Self {
        self.info.foreign.push(ForeignMember {
            member: member.to_string(),
            kind: ForeignKind::BelongsTo,
            source_column: fk_column.to_string(),
            locate: Arc::new(|| {
                let target = TableInfo::<F>::of();
                let column = target.key_column().unwrap_or_default().to_string();
                (target.table().to_string(), column)
            }),
            key_of: Arc::new(move |entity| {
                get(entity)
                    .and_then(|f| {
                        let target = TableInfo::<F>::of();
                        target.key_columns().next().map(|c| c.value_of(f))
                    })
                    .unwrap_or(Value::Null)
            }),
            assign: Arc::new(move |entity, rows| {
                let mut mapped = MappedObject::<F>::new();
                let object = match rows.first() {
                    Some(row) => Some(mapped.read(row)?.0),
                    None => None,
                };
                set(entity, object);
                Ok(())
            }),
        });
        self
    }

    /// A `has many` member: `child_column` of `F`'s table holds this entity's
    /// `key_column` value.
    pub fn has_many<F: Entity>(
        mut self,
        member: &str,
        key_column: &str,
        child_column: &str,
        get_mut: impl Fn(&mut T) -> &mut Vec<F> + Send + Sync + 'static,
    ) -> Self {
        let child_column = child_column.to_string();
        self.info.foreign.push(ForeignMember {
            member: member.to_string(),
            kind: ForeignKind::HasMany,
            source_column: key_column.to_string(),
            locate: Arc::new(move || {
                (TableInfo::<F>::of().table().to_string(), child_column.clone())
            }),
            key_of: Arc::new(|_| Value::Null),
            assign: Arc::new(move |entity, rows| {
                let mut mapped = MappedObject::<F>::new();
                let children = rows
                    .iter()
                    .map(|row| mapped.read(row).map(|(child, _)| child))
                    .collect::<OrmResult<Vec<F>>>()?;
                *get_mut(entity) = children;
                Ok(())
            }),
        });
        self
    }

    /// A constructor taking the named columns, preferred over the default
    /// instance when the result set carries all of them.
    pub fn constructor<S: Into<String>>(
        mut self,
        params: impl IntoIterator<Item = S>,
        build: impl Fn(&Row) -> OrmResult<T> + Send + Sync + 'static,
    ) -> Self {
        self.info.constructors.push(Constructor {
            params: params.into_iter().map(Into::into).collect(),
            build: Arc::new(build),
        });
        self
    }

    /// Start from `T::default()` and set columns one by one.
    pub fn with_default(self) -> Self
    where
        T: Default,
    {
        self.default_with(T::default)
    }

    pub fn default_with(mut self, make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.info.default = Some(Arc::new(make));
        self
    }

    pub fn build(self) -> TableInfo<T> {
        self.info
    }
}
