//! The async facade over the same in-memory executor.

mod common;

use common::MockExecutor;
use polyorm::mapping::MemoryReader;
use polyorm::{
    AsyncDatabase, CancelToken, Entity, OrmError, QueryConfig, Row, TableInfo, Value,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Team {
    id: i64,
    name: String,
}

impl Entity for Team {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Teams")
            .identity("Id", |t: &Team| t.id, |t, v| t.id = v)
            .column("Name", |t: &Team| t.name.clone(), |t, v| t.name = v)
            .with_default()
            .build()
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Player {
    id: i64,
    name: String,
    team: Option<Team>,
}

impl Entity for Player {
    fn table_info() -> TableInfo<Self> {
        TableInfo::builder("Players")
            .key("Id", |p: &Player| p.id, |p, v| p.id = v)
            .column("Name", |p: &Player| p.name.clone(), |p, v| p.name = v)
            .foreign("Team", "TeamId", |p: &Player| p.team.as_ref(), |p, t| p.team = t)
            .with_default()
            .build()
    }
}

fn players() -> MemoryReader {
    MemoryReader::new(["Id", "Name", "TeamId"])
        .with_row([Value::Int(1), "Ana".into(), Value::Int(3)])
        .with_row([Value::Int(2), "Bob".into(), Value::Int(3)])
        .with_row([Value::Int(4), "Cy".into(), Value::Null])
}

#[tokio::test]
async fn select_rows_binds_parameters() {
    let executor = MockExecutor::new().with_reader(
        MemoryReader::new(["Id", "Name"]).with_row([Value::Int(3), "Owls".into()]),
    );
    let mut db = AsyncDatabase::new(QueryConfig::sql_server(), executor);
    let cancel = CancelToken::new();

    let query = db.query("Teams").where_eq("Name", "Owls");
    let teams: Vec<Team> = db.select(&query, &cancel).await.unwrap();
    assert_eq!(
        teams,
        [Team {
            id: 3,
            name: "Owls".into()
        }]
    );
    let executed = &db.executor().executed;
    assert_eq!(executed[0].sql, "SELECT * FROM [Teams] WHERE [Name] = @p1");
    assert_eq!(executed[0].params, vec![Value::Text("Owls".into())]);
}

#[tokio::test]
async fn foreign_rows_are_prefetched_once_per_key() {
    let executor = MockExecutor::new()
        .with_reader(players())
        .with_reader(MemoryReader::new(["Id", "Name"]).with_row([Value::Int(3), "Owls".into()]));
    let mut db = AsyncDatabase::new(QueryConfig::sqlite().with_load_foreign(true), executor);
    let cancel = CancelToken::new();

    let players: Vec<Player> = db.select_all(&cancel).await.unwrap();
    let owls = Team {
        id: 3,
        name: "Owls".into(),
    };
    assert_eq!(players[0].team.as_ref(), Some(&owls));
    assert_eq!(players[1].team.as_ref(), Some(&owls));
    assert_eq!(players[2].team, None);
    assert_eq!(
        db.executor().sql(),
        [
            "SELECT * FROM \"Players\"",
            "SELECT * FROM \"Teams\" WHERE \"Id\" = 3 LIMIT 1",
        ]
    );
}

#[tokio::test]
async fn insert_entity_assigns_the_generated_key() {
    let executor = MockExecutor::new().with_scalar(11i64);
    let mut db = AsyncDatabase::new(QueryConfig::mysql(), executor);
    let cancel = CancelToken::new();

    let mut team = Team {
        id: 0,
        name: "Owls".into(),
    };
    assert_eq!(db.insert_entity(&mut team, &cancel).await.unwrap(), 1);
    assert_eq!(team.id, 11);
    assert_eq!(
        db.executor().sql(),
        ["INSERT INTO `Teams` (`Name`) VALUES (@p1); SELECT LAST_INSERT_ID();"]
    );
}

#[tokio::test]
async fn cancel_token_reaches_the_executor() {
    let mut db = AsyncDatabase::new(QueryConfig::sqlite(), MockExecutor::new());
    let cancel = CancelToken::new();

    let query = db.query("Teams");
    db.select_rows(&query, &cancel).await.unwrap();
    assert!(!db.executor().saw_cancelled);

    cancel.cancel();
    db.count(&query, &cancel).await.unwrap();
    assert!(db.executor().saw_cancelled);
}

#[tokio::test]
async fn transaction_commits_and_rolls_back() {
    let mut db = AsyncDatabase::new(QueryConfig::sql_server(), MockExecutor::new());
    let cancel = CancelToken::new();

    let inserted = db
        .transaction(&cancel, async |db| {
            let row = Row::new().with("Name", "Owls");
            db.insert("Teams", &row, &cancel).await
        })
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let err = db
        .transaction(&cancel, async |db| {
            db.insert("Teams", &Row::new().with("Name", "Elks"), &cancel)
                .await?;
            Err::<u64, _>(OrmError::validation("duplicate team"))
        })
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(
        db.executor().transactions,
        ["begin", "commit", "begin", "rollback"]
    );
    assert_eq!(db.executor().executed.len(), 2);
}
