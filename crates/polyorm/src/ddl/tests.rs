use super::*;
use crate::config::QueryConfig;
use crate::query::Query;

fn users() -> TableSchema {
    TableSchema::new("Users")
        .column(ColumnDef::new("Id", "INT").auto_increment().primary_key())
        .column(
            ColumnDef::new("Name", "NVARCHAR(50)")
                .not_null()
                .default_value("anon"),
        )
        .column(ColumnDef::new("Active", "BIT").default_value(true))
}

// ==================== Constraints ====================

#[test]
fn default_constraint_names() {
    let uc = UniqueConstraint::new("T", ["a", "b"]).unwrap();
    assert_eq!(uc.name, "UC_T_a_b");
    assert_eq!(PrimaryKey::new("T", ["Id"]).unwrap().name, "PK_T");
    assert_eq!(
        ForeignKey::new("Orders", "CustomerId", "Customers", "Id").unwrap().name,
        "FK_Orders_CustomerId"
    );
    assert_eq!(CheckConstraint::new("T", "a > 0").unwrap().name, "CK_T");
    assert_eq!(Index::new("T", ["a", "b"]).unwrap().name, "IX_T_a_b");
    assert_eq!(UniqueConstraint::new("dbo.Users", ["Email"]).unwrap().name, "UC_Users_Email");
    assert_eq!(PrimaryKey::new("T", ["Id"]).unwrap().with_name("MyKey").name, "MyKey");
}

#[test]
fn constraints_validate_eagerly() {
    assert!(UniqueConstraint::new("", ["a"]).unwrap_err().is_validation());
    assert!(UniqueConstraint::new("T", Vec::<String>::new()).unwrap_err().is_validation());
    assert!(PrimaryKey::new("T", [" "]).unwrap_err().is_validation());
    assert!(ForeignKey::new("T", "", "R", "Id").unwrap_err().is_validation());
    assert!(ForeignKey::new("T", "RId", " ", "Id").unwrap_err().is_validation());
    assert!(CheckConstraint::new("T", "  ").unwrap_err().is_validation());
    assert!(Index::new("T", Vec::<&str>::new()).unwrap_err().is_validation());
}

#[test]
fn mysql_unique_constraint() {
    let config = QueryConfig::mysql();
    let uc = UniqueConstraint::new("T", ["a", "b"]).unwrap();
    let sql = TableGrammar::new(&config).add_constraint(&uc.into()).unwrap();
    assert_eq!(sql.to_string(), "ALTER TABLE `T` ADD CONSTRAINT `UC_T_a_b` UNIQUE (`a`,`b`)");
    assert!(sql.values().is_empty());
}

#[test]
fn foreign_key_with_actions() {
    let config = QueryConfig::sql_server();
    let fk = ForeignKey::new("Orders", "CustomerId", "Customers", "Id")
        .unwrap()
        .on_delete(ReferentialAction::Cascade)
        .on_update(ReferentialAction::NoAction);
    assert_eq!(
        TableGrammar::new(&config).add_constraint(&fk.into()).unwrap().to_string(),
        "ALTER TABLE [Orders] ADD CONSTRAINT [FK_Orders_CustomerId] FOREIGN KEY ([CustomerId]) \
         REFERENCES [Customers] ([Id]) ON DELETE CASCADE ON UPDATE NO ACTION"
    );
}

#[test]
fn sqlite_cannot_alter_constraints() {
    let config = QueryConfig::sqlite();
    let grammar = TableGrammar::new(&config);
    let uc = UniqueConstraint::new("T", ["a"]).unwrap();
    assert!(grammar.add_constraint(&uc.into()).unwrap_err().is_not_supported());
    assert!(grammar.drop_constraint("T", "UC_T_a").unwrap_err().is_not_supported());
}

#[test]
fn drop_constraint() {
    let config = QueryConfig::firebird();
    assert_eq!(
        TableGrammar::new(&config)
            .drop_constraint("Users", "UC_Users_Email")
            .unwrap()
            .to_string(),
        "ALTER TABLE \"Users\" DROP CONSTRAINT \"UC_Users_Email\""
    );
}

// ==================== CREATE ====================

#[test]
fn create_sql_server() {
    let config = QueryConfig::sql_server();
    let sql = TableGrammar::new(&config).create(&users()).unwrap();
    assert_eq!(
        sql.to_string(),
        "CREATE TABLE [Users] ([Id] INT IDENTITY(1,1) NOT NULL, \
         [Name] NVARCHAR(50) DEFAULT 'anon' NOT NULL, [Active] BIT DEFAULT 1, \
         CONSTRAINT [PK_Users] PRIMARY KEY ([Id]))"
    );
    assert!(sql.values().is_empty());
}

#[test]
fn create_with_constraints() {
    let config = QueryConfig::firebird();
    let schema = TableSchema::new("Orders")
        .column(ColumnDef::new("Id", "INTEGER").not_null())
        .column(ColumnDef::new("CustomerId", "INTEGER"))
        .column(ColumnDef::new("Total", "DECIMAL(18,2)").default_value(0))
        .constraint(PrimaryKey::new("Orders", ["Id"]).unwrap())
        .constraint(ForeignKey::new("Orders", "CustomerId", "Customers", "Id").unwrap())
        .constraint(CheckConstraint::new("Orders", "\"Total\" >= 0").unwrap());
    assert_eq!(
        TableGrammar::new(&config).create(&schema).unwrap().to_string(),
        "CREATE TABLE \"Orders\" (\"Id\" INTEGER NOT NULL, \"CustomerId\" INTEGER, \
         \"Total\" DECIMAL(18,2) DEFAULT 0, CONSTRAINT \"PK_Orders\" PRIMARY KEY (\"Id\"), \
         CONSTRAINT \"FK_Orders_CustomerId\" FOREIGN KEY (\"CustomerId\") \
         REFERENCES \"Customers\" (\"Id\"), CONSTRAINT \"CK_Orders\" CHECK (\"Total\" >= 0))"
    );
}

#[test]
fn sqlite_autoincrement_key_is_inline() {
    let config = QueryConfig::sqlite();
    let schema = TableSchema::new("Users")
        .column(ColumnDef::new("Id", "INTEGER").auto_increment().primary_key())
        .column(ColumnDef::new("Name", "TEXT"));
    assert_eq!(
        TableGrammar::new(&config).create(&schema).unwrap().to_string(),
        "CREATE TABLE \"Users\" (\"Id\" INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL, \"Name\" TEXT)"
    );
}

#[test]
fn temporary_tables() {
    let schema = TableSchema::new("Tmp")
        .column(ColumnDef::new("Id", "INTEGER"))
        .temporary(true);
    let build = |config: QueryConfig| {
        TableGrammar::new(&config)
            .create(&schema)
            .unwrap()
            .to_string()
    };
    assert_eq!(build(QueryConfig::sql_server()), "CREATE TABLE [#Tmp] ([Id] INTEGER)");
    assert_eq!(build(QueryConfig::mysql()), "CREATE TEMPORARY TABLE `Tmp` (`Id` INTEGER)");
    assert_eq!(build(QueryConfig::sqlite()), "CREATE TEMP TABLE \"Tmp\" (\"Id\" INTEGER)");
    assert_eq!(
        build(QueryConfig::firebird()),
        "CREATE GLOBAL TEMPORARY TABLE \"Tmp\" (\"Id\" INTEGER) ON COMMIT PRESERVE ROWS"
    );
}

#[test]
fn create_rejects_bad_schemas() {
    let config = QueryConfig::mysql();
    let grammar = TableGrammar::new(&config);
    assert!(grammar.create(&TableSchema::new("Empty")).unwrap_err().is_validation());
    let nameless = TableSchema::new(" ").column(ColumnDef::new("Id", "INT"));
    assert!(grammar.create(&nameless).unwrap_err().is_validation());
    let blob_default = TableSchema::new("T")
        .column(ColumnDef::new("Data", "BLOB").default_value(vec![1u8, 2]));
    assert!(grammar.create(&blob_default).unwrap_err().is_validation());
}

#[test]
fn create_based_on_query() {
    let mysql = QueryConfig::mysql();
    let source = Query::new("Users", mysql.clone()).where_eq("Active", true);
    assert_eq!(
        TableGrammar::new(&mysql)
            .create_based_on("Backup", source.info())
            .unwrap()
            .to_string(),
        "CREATE TABLE `Backup` AS SELECT * FROM `Users` WHERE `Active` = 1"
    );

    let sql_server = QueryConfig::sql_server();
    let source = Query::new("Users", sql_server.clone()).where_eq("Name", "a");
    let sql = TableGrammar::new(&sql_server)
        .create_based_on("Backup", source.info())
        .unwrap();
    assert_eq!(
        sql.to_string(),
        "SELECT * INTO [Backup] FROM (SELECT * FROM [Users] WHERE [Name] = ?) [source]"
    );
    assert_eq!(sql.values().len(), 1);

    let firebird = QueryConfig::firebird();
    let source = Query::new("Users", firebird.clone());
    assert!(
        TableGrammar::new(&firebird)
            .create_based_on("Backup", source.info())
            .unwrap_err()
            .is_not_supported()
    );
}

// ==================== DROP / EXISTS / TRUNCATE ====================

#[test]
fn drop_and_truncate() {
    let sql_server = QueryConfig::sql_server();
    let sqlite = QueryConfig::sqlite();
    assert_eq!(
        TableGrammar::new(&sql_server).drop("Users").unwrap().to_string(),
        "DROP TABLE [Users]"
    );
    assert_eq!(
        TableGrammar::new(&sql_server).truncate("Users").unwrap().to_string(),
        "TRUNCATE TABLE [Users]"
    );
    assert_eq!(
        TableGrammar::new(&sqlite).truncate("Users").unwrap().to_string(),
        "DELETE FROM \"Users\""
    );
    assert!(TableGrammar::new(&sqlite).drop("").unwrap_err().is_validation());
}

#[test]
fn exists_binds_the_table_name() {
    let sqlite = QueryConfig::sqlite();
    let sql = TableGrammar::new(&sqlite).exists("Users").unwrap();
    assert_eq!(
        sql.to_string(),
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
    );
    assert_eq!(sql.values(), vec![crate::value::Value::Text("Users".into())]);

    let sql_server = QueryConfig::sql_server();
    let temp = TableGrammar::new(&sql_server).exists("#Tmp").unwrap();
    assert_eq!(
        temp.to_string(),
        "SELECT CASE WHEN OBJECT_ID(?) IS NULL THEN 0 ELSE 1 END"
    );
    assert_eq!(temp.values(), vec![crate::value::Value::Text("tempdb..#Tmp".into())]);
}

// ==================== Indexes ====================

#[test]
fn create_and_drop_index() {
    let sqlite = QueryConfig::sqlite();
    let index = Index::new("Users", ["Name", "Email"]).unwrap().unique();
    assert_eq!(
        TableGrammar::new(&sqlite).create_index(&index).unwrap().to_string(),
        "CREATE UNIQUE INDEX \"IX_Users_Name_Email\" ON \"Users\" (\"Name\",\"Email\")"
    );
    assert_eq!(
        TableGrammar::new(&sqlite)
            .drop_index("Users", "IX_Users_Name_Email")
            .unwrap()
            .to_string(),
        "DROP INDEX \"IX_Users_Name_Email\""
    );

    let mysql = QueryConfig::mysql();
    assert_eq!(
        TableGrammar::new(&mysql)
            .drop_index("Users", "IX_Users_Name")
            .unwrap()
            .to_string(),
        "DROP INDEX `IX_Users_Name` ON `Users`"
    );
}
