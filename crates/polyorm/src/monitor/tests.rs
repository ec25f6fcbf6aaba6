use super::*;
use crate::dialect::Dialect;
use std::sync::Arc;
use std::time::Duration;

fn ctx(sql: &str) -> QueryContext {
    QueryContext::new(sql, 0, Dialect::SqlServer)
}

#[test]
fn test_query_type_detection() {
    assert_eq!(QueryType::from_sql("SELECT * FROM [Users]"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  select TOP (1) 1"), QueryType::Select);
    assert_eq!(QueryType::from_sql("(SELECT 1)"), QueryType::Select);
    assert_eq!(
        QueryType::from_sql("INSERT INTO `Users` (`Name`) VALUES (@p1)"),
        QueryType::Insert
    );
    assert_eq!(
        QueryType::from_sql(
            "INSERT INTO `Users` (`Id`, `Name`) VALUES (1, @p1) ON DUPLICATE KEY UPDATE `Name` = VALUES(`Name`)"
        ),
        QueryType::Upsert
    );
    assert_eq!(
        QueryType::from_sql("MERGE INTO [Users] USING (VALUES (1)) AS [source] ([Id])"),
        QueryType::Upsert
    );
    assert_eq!(QueryType::from_sql("UPDATE [Users] SET [Name] = @p1"), QueryType::Update);
    assert_eq!(QueryType::from_sql("DELETE FROM [Users]"), QueryType::Delete);
    assert_eq!(
        QueryType::from_sql("EXECUTE BLOCK AS BEGIN INSERT INTO T (A) VALUES (1); END"),
        QueryType::Insert
    );
    assert_eq!(QueryType::from_sql("CREATE TABLE T (Id INT)"), QueryType::Ddl);
    assert_eq!(QueryType::from_sql("TRUNCATE TABLE T"), QueryType::Ddl);
    assert_eq!(QueryType::from_sql("SELECTED"), QueryType::Other);
    assert_eq!(QueryType::from_sql(""), QueryType::Other);
}

#[test]
fn test_truncate_respects_char_boundaries() {
    assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
    assert_eq!(truncate_sql_bytes("SELECT 'é'", 9), "SELECT '");
}

#[test]
fn test_error_result_is_truncated() {
    let long = "x".repeat(600);
    match QueryResult::error(long) {
        QueryResult::Error(msg) => {
            assert_eq!(msg.len(), 515);
            assert!(msg.ends_with("..."));
        }
        other => panic!("unexpected result: {other}"),
    }
    assert_eq!(QueryResult::error("boom".into()).to_string(), "error: boom");
}

#[test]
fn test_stats_hook() {
    let hook = StatsHook::new();
    let select = ctx("SELECT * FROM [Users]");
    let delete = ctx("DELETE FROM [Users]");

    hook.after_query(&select, Duration::from_millis(10), &QueryResult::Rows(5));
    hook.after_query(&select, Duration::from_millis(20), &QueryResult::Rows(3));
    hook.after_query(
        &delete,
        Duration::from_millis(5),
        &QueryResult::error("locked".into()),
    );

    let stats = hook.stats();
    assert_eq!(stats.total_queries, 3);
    assert_eq!(stats.select_count, 2);
    assert_eq!(stats.delete_count, 1);
    assert_eq!(stats.failed_queries, 1);
    assert_eq!(stats.total_duration, Duration::from_millis(35));
    assert_eq!(stats.max_duration, Duration::from_millis(20));
    assert_eq!(stats.slowest_query.as_deref(), Some("SELECT * FROM [Users]"));

    hook.reset();
    assert_eq!(hook.stats(), QueryStats::default());
}

struct Rewrite(&'static str);

impl QueryHook for Rewrite {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        HookAction::ModifySql(format!("{} {}", ctx.sql, self.0))
    }
}

struct Deny;

impl QueryHook for Deny {
    fn before_query(&self, ctx: &QueryContext) -> HookAction {
        match ctx.query_type {
            QueryType::Delete => HookAction::Abort("deletes are disabled".into()),
            _ => HookAction::Continue,
        }
    }
}

#[test]
fn test_composite_hook_chains_modifications() {
    let hook = CompositeHook::new()
        .add(Rewrite("/* a */"))
        .add(Rewrite("/* b */"));
    assert_eq!(hook.len(), 2);
    assert_eq!(
        hook.before_query(&ctx("SELECT 1")),
        HookAction::ModifySql("SELECT 1 /* a */ /* b */".into())
    );
}

#[test]
fn test_composite_hook_stops_at_abort() {
    let stats = Arc::new(StatsHook::new());
    let hook = CompositeHook::new().add(Deny).add_arc(stats.clone());

    assert_eq!(hook.before_query(&ctx("SELECT 1")), HookAction::Continue);
    assert_eq!(
        hook.before_query(&ctx("DELETE FROM [T]")),
        HookAction::Abort("deletes are disabled".into())
    );

    hook.after_query(&ctx("SELECT 1"), Duration::from_millis(1), &QueryResult::Rows(1));
    assert_eq!(stats.stats().total_queries, 1);
}

#[cfg(feature = "tracing")]
#[test]
fn test_tracing_hook_truncation() {
    let hook = TracingSqlHook::new().max_sql_length(10);
    assert_eq!(hook.truncate_sql("SELECT * FROM users"), "SELECT * F...");
    assert_eq!(hook.truncate_sql("SELECT 1"), "SELECT 1");
    assert_eq!(
        TracingSqlHook::new().no_truncate().truncate_sql(&"x".repeat(300)).len(),
        300
    );
    assert_eq!(hook.before_query(&ctx("SELECT 1")), HookAction::Continue);
}
