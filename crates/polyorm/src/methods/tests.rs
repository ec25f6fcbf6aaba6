use super::*;
use crate::config::QueryConfig;
use crate::expression::ParamStyle;
use crate::member::{ExpressionConfig, ExpressionProcessor, MemberExpr};
use crate::query::{JoinKind, QueryInfo, TableName};
use crate::condition::Condition;

fn compile(config: QueryConfig, expr: &MemberExpr) -> OrmResult<SqlExpression> {
    let info = QueryInfo::new("TestTable", config);
    let member = ExpressionProcessor::new(&info.config, ExpressionConfig::default()).single(expr)?;
    SqlMethodRegistry::shared(info.config.dialect).apply_member(&info, &member, false)
}

fn name() -> MemberExpr {
    MemberExpr::param().prop("Name", MemberType::String)
}

fn created() -> MemberExpr {
    MemberExpr::param().prop("Created", MemberType::DateTime)
}

#[test]
fn lowercase_on_sql_server() {
    let expr = name().call("to_lowercase", []);
    let sql = compile(QueryConfig::sql_server(), &expr).unwrap();
    assert_eq!(sql.to_string(), "LOWER([Name])");
    assert!(sql.values().is_empty());
}

#[test]
fn nested_chain_wraps_inside_out() {
    let expr = name()
        .call("substring", [0.into(), 3.into()])
        .call("to_uppercase", []);
    let sql = compile(QueryConfig::sql_server(), &expr).unwrap();
    assert_eq!(sql.to_string(), "UPPER(SUBSTRING([Name],?,?))");
    // substring positions become 1-based
    assert_eq!(sql.values(), vec![Value::Int(1), Value::Int(3)]);
    assert_eq!(
        sql.render(ParamStyle::At).sql,
        "UPPER(SUBSTRING([Name],@p1,@p2))"
    );
}

#[test]
fn unknown_member_is_not_mapped() {
    let expr = name().call("pad_left", [5.into()]);
    let err = compile(QueryConfig::mysql(), &expr).unwrap_err();
    assert!(err.is_not_mapped());
    assert_eq!(err.to_string(), "type String not mapped with member pad_left");
}

#[test]
fn translation_is_deterministic() {
    let expr = name().call("trim", []).call("to_uppercase", []);
    let a = compile(QueryConfig::sqlite(), &expr).unwrap();
    let b = compile(QueryConfig::sqlite(), &expr).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_string(), "UPPER(TRIM(\"Name\"))");
}

struct ShoutCaller;

impl SqlCaller for ShoutCaller {
    fn can_work(&self, member: &SqlMemberInfo) -> bool {
        member.is_method(&MemberType::String, "to_uppercase")
    }

    fn get_sql_expression(
        &self,
        _info: &dyn QueryInfoView,
        current: SqlExpression,
        _member: &SqlMemberInfo,
        _args: Vec<SqlParam>,
    ) -> OrmResult<SqlExpression> {
        Ok(current.wrap("SHOUT(", ")"))
    }
}

#[test]
fn first_registered_caller_wins() {
    let info = QueryInfo::new("TestTable", QueryConfig::sql_server());
    let member = ExpressionProcessor::new(&info.config, ExpressionConfig::default())
        .single(&name().call("to_uppercase", []))
        .unwrap();

    let mut registry = SqlMethodRegistry::for_dialect(Dialect::SqlServer);
    let builtin = registry.apply_member(&info, &member, false).unwrap();
    assert_eq!(builtin.to_string(), "UPPER([Name])");

    registry.add(ShoutCaller);
    let appended = registry.apply_member(&info, &member, false).unwrap();
    assert_eq!(appended.to_string(), "UPPER([Name])");

    registry.add_first(ShoutCaller);
    let overridden = registry.apply_member(&info, &member, false).unwrap();
    assert_eq!(overridden.to_string(), "SHOUT([Name])");
    assert_eq!(registry.len(), 5);
}

#[test]
fn empty_registry_maps_nothing() {
    let info = QueryInfo::new("T", QueryConfig::mysql());
    let member = ExpressionProcessor::new(&info.config, ExpressionConfig::default())
        .single(&name().call("to_lowercase", []))
        .unwrap();
    let registry = SqlMethodRegistry::new();
    assert!(registry.is_empty());
    let err = registry.apply_member(&info, &member, false).unwrap_err();
    assert!(err.is_not_mapped());
}

#[test]
fn static_now_per_dialect() {
    let now = MemberExpr::static_member(MemberType::DateTime, "now", MemberType::DateTime);
    let expected = [
        (QueryConfig::sql_server(), "GETDATE()"),
        (QueryConfig::mysql(), "NOW()"),
        (QueryConfig::sqlite(), "DATETIME('now', 'localtime')"),
        (QueryConfig::firebird(), "CURRENT_TIMESTAMP"),
    ];
    for (config, sql) in expected {
        assert_eq!(compile(config, &now).unwrap().to_string(), sql);
    }
}

#[test]
fn static_root_with_property() {
    let year = MemberExpr::static_member(MemberType::DateTime, "now", MemberType::DateTime)
        .prop("year", MemberType::Number);
    let sql = compile(QueryConfig::mysql(), &year).unwrap();
    assert_eq!(sql.to_string(), "YEAR(NOW())");
}

#[test]
fn date_parts() {
    let month = created().prop("month", MemberType::Number);
    assert_eq!(
        compile(QueryConfig::sql_server(), &month).unwrap().to_string(),
        "DATEPART(MONTH, [Created])"
    );
    assert_eq!(
        compile(QueryConfig::sqlite(), &month).unwrap().to_string(),
        "CAST(STRFTIME('%m', \"Created\") AS INTEGER)"
    );
    assert_eq!(
        compile(QueryConfig::firebird(), &month).unwrap().to_string(),
        "EXTRACT(MONTH FROM \"Created\")"
    );
}

#[test]
fn add_days_argument_order() {
    let expr = created().call("add_days", [7.into()]);
    assert_eq!(
        compile(QueryConfig::sql_server(), &expr).unwrap().to_string(),
        "DATEADD(DAY, ?, [Created])"
    );
    assert_eq!(
        compile(QueryConfig::mysql(), &expr).unwrap().to_string(),
        "DATE_ADD(`Created`, INTERVAL ? DAY)"
    );
    assert_eq!(
        compile(QueryConfig::firebird(), &expr).unwrap().to_string(),
        "DATEADD(? DAY TO \"Created\")"
    );
}

#[test]
fn mysql_date_format_is_translated() {
    let expr = created().call_as("format", ["dd/MM/yyyy HH:mm".into()], MemberType::String);
    let sql = compile(QueryConfig::mysql(), &expr).unwrap();
    assert_eq!(sql.to_string(), "DATE_FORMAT(`Created`, ?)");
    assert_eq!(sql.values(), vec![Value::Text("%d/%m/%Y %H:%i".into())]);
}

#[test]
fn sqlite_date_format_is_translated() {
    let expr = created().call_as("to_string", ["yyyy-MM-dd".into()], MemberType::String);
    let sql = compile(QueryConfig::sqlite(), &expr).unwrap();
    assert_eq!(sql.to_string(), "STRFTIME(?, \"Created\")");
    assert_eq!(sql.values(), vec![Value::Text("%Y-%m-%d".into())]);
}

#[test]
fn firebird_rejects_custom_date_format() {
    let expr = created().call_as("format", ["yyyy".into()], MemberType::String);
    let err = compile(QueryConfig::firebird(), &expr).unwrap_err();
    assert!(err.is_not_supported());

    let plain = created().call_as("to_string", [], MemberType::String);
    assert_eq!(
        compile(QueryConfig::firebird(), &plain).unwrap().to_string(),
        "CAST(\"Created\" AS VARCHAR(24))"
    );
}

#[test]
fn firebird_has_no_utc_now() {
    let utc = MemberExpr::static_member(MemberType::DateTime, "utc_now", MemberType::DateTime);
    assert!(compile(QueryConfig::firebird(), &utc).unwrap_err().is_not_supported());
}

#[test]
fn concat_per_dialect() {
    let expr = name().call("concat", ["!".into()]);
    assert_eq!(
        compile(QueryConfig::mysql(), &expr).unwrap().to_string(),
        "CONCAT(`Name`,?)"
    );
    assert_eq!(
        compile(QueryConfig::sqlite(), &expr).unwrap().to_string(),
        "(\"Name\" || ?)"
    );
}

#[test]
fn member_argument_is_compiled() {
    let other = MemberExpr::param().prop("Surname", MemberType::String);
    let expr = name().call("concat", [other.into()]);
    let sql = compile(QueryConfig::sql_server(), &expr).unwrap();
    assert_eq!(sql.to_string(), "CONCAT([Name],[Surname])");
}

#[test]
fn missing_argument_is_validation_error() {
    let expr = name().call("replace", ["a".into()]);
    let err = compile(QueryConfig::sql_server(), &expr).unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn joins_force_table_prefix() {
    let mut info = QueryInfo::new(TableName::new("TestTable t1"), QueryConfig::sql_server());
    let mut on = crate::condition::ConditionGroup::new();
    on.and(Condition::columns("t2.Id", "=", "t1.Id"));
    info.joins.push(crate::query::JoinInfo {
        kind: JoinKind::Inner,
        table: TableName::new("Other t2"),
        on,
    });
    let member = ExpressionProcessor::new(&info.config, ExpressionConfig::default())
        .single(&name().call("to_lowercase", []))
        .unwrap();
    let sql = SqlMethodRegistry::shared(Dialect::SqlServer)
        .apply_member(&info, &member, info.has_joins())
        .unwrap();
    assert_eq!(sql.to_string(), "LOWER([t1].[Name])");
}
