use super::*;
use crate::config::{Nomenclature, QueryConfig};
use crate::error::OrmError;
use crate::value::Value;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
struct Address {
    city: String,
    zip: String,
}

impl Entity for Address {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Addresses")
            .column("City", |a: &Address| a.city.clone(), |a, v| a.city = v)
            .column("Zip", |a: &Address| a.zip.clone(), |a, v| a.zip = v)
            .with_default()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Customer {
    id: i64,
    name: String,
    address: Address,
    orders: Vec<Order>,
}

impl Entity for Customer {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Customers")
            .identity("Id", |c: &Customer| c.id, |c, v| c.id = v)
            .column("Name", |c: &Customer| c.name.clone(), |c, v| c.name = v)
            .nested("Address", "Address", |c: &Customer| &c.address, |c| &mut c.address)
            .has_many("Orders", "Id", "CustomerId", |c: &mut Customer| &mut c.orders)
            .with_default()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Order {
    id: i64,
    total: f64,
    customer: Option<Customer>,
}

impl Entity for Order {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Orders")
            .identity("Id", |o: &Order| o.id, |o, v| o.id = v)
            .column("Total", |o: &Order| o.total, |o, v| o.total = v)
            .foreign(
                "Customer",
                "CustomerId",
                |o: &Order| o.customer.as_ref(),
                |o, c| o.customer = c,
            )
            .with_default()
            .build()
    }
}

#[derive(Debug, PartialEq)]
struct Point {
    x: i64,
    y: i64,
    label: String,
}

impl Entity for Point {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Points")
            .column("X", |p: &Point| p.x, |p, v| p.x = v)
            .column("Y", |p: &Point| p.y, |p, v| p.y = v)
            .column("Label", |p: &Point| p.label.clone(), |p, v| p.label = v)
            .constructor(["X", "Y"], |row| {
                Ok(Point {
                    x: row.get("X")?,
                    y: row.get("Y")?,
                    label: String::new(),
                })
            })
            .build()
    }
}

#[derive(Debug, Default)]
struct Account {
    first_name: String,
}

impl Entity for Account {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("user_accounts")
            .nomenclature(Nomenclature::SnakeCase)
            .column(
                "FirstName",
                |a: &Account| a.first_name.clone(),
                |a, v| a.first_name = v,
            )
            .with_default()
            .build()
    }
}

/// Serves canned rows per table and records every request.
#[derive(Default)]
struct StubQueue {
    rows: Vec<(String, Row)>,
    requests: Vec<(String, String, Value, ForeignKind)>,
}

impl StubQueue {
    fn with(mut self, table: &str, row: Row) -> Self {
        self.rows.push((table.to_string(), row));
        self
    }
}

impl FkQueue for StubQueue {
    fn load(&mut self, request: &ForeignRequest<'_>) -> OrmResult<Vec<Row>> {
        self.requests.push((
            request.table.to_string(),
            request.column.to_string(),
            request.key.clone(),
            request.kind,
        ));
        Ok(self
            .rows
            .iter()
            .filter(|(table, row)| {
                table == request.table && row.value(request.column) == Some(request.key)
            })
            .map(|(_, row)| row.clone())
            .collect())
    }
}

fn names(row: &Row) -> Vec<&str> {
    row.names().collect()
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Location {
    street_name: String,
}

impl Entity for Location {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("locations")
            .nomenclature(Nomenclature::SnakeCase)
            .column(
                "StreetName",
                |l: &Location| l.street_name.clone(),
                |l, v| l.street_name = v,
            )
            .with_default()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Site {
    location: Location,
}

impl Entity for Site {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("sites")
            .nomenclature(Nomenclature::SnakeCase)
            .nested("Location", "location_", |s: &Site| &s.location, |s| &mut s.location)
            .with_default()
            .build()
    }
}

// ==================== Metadata ====================

#[test]
fn metadata_is_cached_per_type() {
    let a = TableInfo::<Order>::of();
    let b = TableInfo::<Order>::of();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.table(), "Orders");
    assert_eq!(a.key_column(), Some("Id"));
}

#[test]
fn nested_columns_are_prefixed() {
    let info = TableInfo::<Customer>::of();
    let columns: Vec<&str> = info.columns().iter().map(ColumnInfo::name).collect();
    assert_eq!(columns, ["Id", "Name", "AddressCity", "AddressZip"]);
    assert_eq!(info.column("addresscity").map(ColumnInfo::member), Some("Address.City"));
}

#[test]
fn nomenclature_applies_to_member_names() {
    let info = TableInfo::<Account>::of();
    assert_eq!(info.columns()[0].name(), "first_name");
    assert_eq!(info.table(), "user_accounts");
}

#[test]
fn foreign_targets() {
    let orders = TableInfo::<Order>::of();
    let customer = &orders.foreign()[0];
    assert_eq!(customer.kind(), ForeignKind::BelongsTo);
    assert_eq!(customer.source_column(), "CustomerId");
    assert_eq!(customer.target(), ("Customers".to_string(), "Id".to_string()));

    let customers = TableInfo::<Customer>::of();
    let orders = &customers.foreign()[0];
    assert_eq!(orders.kind(), ForeignKind::HasMany);
    assert_eq!(orders.target(), ("Orders".to_string(), "CustomerId".to_string()));
}

#[test]
fn member_expressions_target_nested_mapping_columns() {
    use crate::member::{MemberExpr, MemberType};
    use crate::query::Query;

    let expr = MemberExpr::param()
        .prop("Address", MemberType::entity("Address"))
        .prop("City", MemberType::String);
    let sql = Query::new("Customers", QueryConfig::sql_server())
        .where_member(&expr, "=", "x")
        .unwrap()
        .to_select()
        .unwrap()
        .to_string();
    let info = TableInfo::<Customer>::of();
    assert_eq!(info.column("AddressCity").map(ColumnInfo::member), Some("Address.City"));
    assert_eq!(sql, "SELECT * FROM [Customers] WHERE [AddressCity] = ?");

    let snake = QueryConfig::sql_server().with_nomenclature(Nomenclature::SnakeCase);
    let expr = MemberExpr::param()
        .prop("Location", MemberType::entity("Location"))
        .prop("StreetName", MemberType::String);
    let sql = Query::new("sites", snake)
        .where_member(&expr, "=", "x")
        .unwrap()
        .to_select()
        .unwrap()
        .to_string();
    let info = TableInfo::<Site>::of();
    assert_eq!(info.columns()[0].name(), "location_street_name");
    assert_eq!(info.columns()[0].member(), "Location.StreetName");
    assert_eq!(sql, "SELECT * FROM [sites] WHERE [location_street_name] = ?");
}

// ==================== Rows for writes ====================

#[test]
fn row_of_includes_foreign_keys() {
    let order = Order {
        id: 3,
        total: 9.5,
        customer: Some(Customer {
            id: 7,
            ..Customer::default()
        }),
    };
    let info = TableInfo::<Order>::of();
    let row = info.row_of(&order);
    assert_eq!(names(&row), ["Id", "Total", "CustomerId"]);
    assert_eq!(row.value("CustomerId"), Some(&Value::Int(7)));
    assert_eq!(names(&info.insert_row_of(&order)), ["Total", "CustomerId"]);
    assert_eq!(names(&info.update_row_of(&order)), ["Total", "CustomerId"]);

    let detached = Order::default();
    assert_eq!(info.row_of(&detached).value("CustomerId"), Some(&Value::Null));
}

#[test]
fn row_of_flattens_nested_objects() {
    let customer = Customer {
        id: 1,
        name: "Ana".into(),
        address: Address {
            city: "Porto".into(),
            zip: "4000".into(),
        },
        orders: Vec::new(),
    };
    let row = TableInfo::<Customer>::of().row_of(&customer);
    assert_eq!(names(&row), ["Id", "Name", "AddressCity", "AddressZip"]);
    assert_eq!(row.value("AddressCity"), Some(&Value::Text("Porto".into())));
}

#[test]
fn key_values() {
    let order = Order {
        id: 3,
        ..Order::default()
    };
    let keys = TableInfo::<Order>::of().key_values(&order).unwrap();
    assert_eq!(keys, vec![("Id".to_string(), Value::Int(3))]);

    let err = TableInfo::<Address>::of()
        .key_values(&Address::default())
        .unwrap_err();
    assert!(err.is_validation());
}

// ==================== Reading ====================

#[test]
fn read_with_default_instance() {
    let reader = MemoryReader::new(["id", "NAME", "AddressCity", "AddressZip", "Extra"]).with_row([
        Value::Int(1),
        "Ana".into(),
        "Porto".into(),
        "4000".into(),
        Value::Bool(true),
    ]);
    let customers = MappedObject::<Customer>::new().read_all(reader, None).unwrap();
    assert_eq!(
        customers,
        vec![Customer {
            id: 1,
            name: "Ana".into(),
            address: Address {
                city: "Porto".into(),
                zip: "4000".into(),
            },
            orders: Vec::new(),
        }]
    );
}

#[test]
fn read_prefers_a_matching_constructor() {
    let reader = MemoryReader::new(["X", "Y", "Label"])
        .with_row([Value::Int(1), Value::Int(2), "a".into()])
        .with_row([Value::Int(3), Value::Int(4), "b".into()]);
    let points = MappedObject::<Point>::new().read_all(reader, None).unwrap();
    assert_eq!(
        points,
        vec![
            Point { x: 1, y: 2, label: "a".into() },
            Point { x: 3, y: 4, label: "b".into() },
        ]
    );
}

#[test]
fn no_suitable_constructor() {
    let reader = MemoryReader::new(["X", "Label"]).with_row([Value::Int(1), "a".into()]);
    let err = MappedObject::<Point>::new().read_all(reader, None).unwrap_err();
    match err {
        OrmError::NoSuitableConstructor { columns, .. } => assert_eq!(columns, "X, Label"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn decode_error_names_the_column() {
    let reader = MemoryReader::new(["Id", "Name"]).with_row([Value::Int(1), Value::Int(2)]);
    let err = MappedObject::<Customer>::new().read_all(reader, None).unwrap_err();
    match err {
        OrmError::Decode { column, .. } => assert_eq!(column, "Name"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn row_width_is_checked_after_the_first_row() {
    let mut mapped = MappedObject::<Customer>::new();
    let first = Row::new().with("Id", 1).with("Name", "a");
    assert!(mapped.read(&first).is_ok());
    let wider = Row::new().with("Id", 2).with("Name", "b").with("Other", 3);
    assert!(matches!(mapped.read(&wider), Err(OrmError::Decode { .. })));

    let mut reader = MemoryReader::new(["Id", "Name"]);
    reader.push_row(vec![Value::Int(1)]);
    let rows = RowReader::new(reader).read_all();
    assert!(matches!(rows, Err(OrmError::Decode { .. })));
}

// ==================== Foreign members ====================

#[test]
fn belongs_to_is_resolved_through_the_queue() {
    let reader = MemoryReader::new(["Id", "Total", "CustomerId"])
        .with_row([Value::Int(1), Value::Float(9.5), Value::Int(7)])
        .with_row([Value::Int(2), Value::Float(1.0), Value::Null]);
    let mut queue =
        StubQueue::default().with("Customers", Row::new().with("Id", 7).with("Name", "Ana"));

    let orders = MappedObject::<Order>::new()
        .read_all(reader, Some(&mut queue))
        .unwrap();
    assert_eq!(orders.len(), 2);
    let customer = orders[0].customer.as_ref().unwrap();
    assert_eq!((customer.id, customer.name.as_str()), (7, "Ana"));
    assert!(orders[1].customer.is_none());

    // The null key never reaches the queue.
    assert_eq!(
        queue.requests,
        vec![(
            "Customers".to_string(),
            "Id".to_string(),
            Value::Int(7),
            ForeignKind::BelongsTo
        )]
    );
}

#[test]
fn has_many_is_resolved_through_the_queue() {
    let reader = MemoryReader::new(["Id", "Name"]).with_row([Value::Int(1), "Ana".into()]);
    let order = |id: i64, customer: i64| {
        Row::new()
            .with("Id", id)
            .with("Total", 2.5)
            .with("CustomerId", customer)
    };
    let mut queue = StubQueue::default()
        .with("Orders", order(10, 1))
        .with("Orders", order(11, 2))
        .with("Orders", order(12, 1));

    let customers = MappedObject::<Customer>::new()
        .read_all(reader, Some(&mut queue))
        .unwrap();
    let ids: Vec<i64> = customers[0].orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, [10, 12]);
    assert!(customers[0].orders.iter().all(|o| o.customer.is_none()));
}

#[test]
fn foreign_members_stay_empty_without_a_queue() {
    let reader = MemoryReader::new(["Id", "Total", "CustomerId"])
        .with_row([Value::Int(1), Value::Float(9.5), Value::Int(7)]);
    let orders = MappedObject::<Order>::new().read_all(reader, None).unwrap();
    assert!(orders[0].customer.is_none());

    let mut mapped = MappedObject::<Order>::new();
    let (_, pending) = mapped
        .read(&Row::new().with("Id", 1).with("Total", 1.0).with("CustomerId", 7))
        .unwrap();
    assert_eq!(
        pending,
        vec![ForeignInfo {
            owner: 0,
            member: 0,
            key: Value::Int(7)
        }]
    );
}

#[test]
fn memory_reader_from_rows() {
    let rows = vec![
        Row::new().with("A", 1).with("B", "x"),
        Row::new().with("A", 2).with("B", "y"),
    ];
    let reader = MemoryReader::from_rows(rows.clone());
    assert_eq!(reader.columns(), ["A", "B"]);
    assert_eq!(reader.remaining(), 2);
    let read = RowReader::new(reader).read_all().unwrap();
    assert_eq!(read, rows);
    assert_eq!(Row::from_row(&read[0]).unwrap(), rows[0]);
}
