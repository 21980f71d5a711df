//! End-to-end schema evolution tests against in-memory SQLite.

#![cfg(feature = "sqlite")]

use forum_db::{
    bootstrap, column_exists, create_pool, ensure_column, evolve_schema, registry, table_exists,
    DbConfig, DbPool,
};
use sqlx::Row;
use tempfile::TempDir;

async fn memory_pool() -> DbPool {
    create_pool(&DbConfig::sqlite_memory()).await.unwrap()
}

/// Table names and their full DDL as stored in the catalog.
async fn schema_snapshot(pool: &DbPool) -> Vec<(String, String)> {
    sqlx::query("SELECT name, sql FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
        .iter()
        .map(|row| (row.get::<String, _>("name"), row.get::<String, _>("sql")))
        .collect()
}

async fn insert_user(pool: &DbPool, username: &str) -> i64 {
    sqlx::query(
        "INSERT INTO users (username, firstname, lastname, email, password) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind("Test")
    .bind("User")
    .bind(format!("{username}@example.com"))
    .bind("hash")
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

async fn insert_question(pool: &DbPool, userid: i64) -> i64 {
    sqlx::query("INSERT INTO questions (userid, title, description) VALUES (?, ?, ?)")
        .bind(userid)
        .bind("How do cascades work?")
        .bind("Deleting a parent should remove its children.")
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

async fn insert_answer(pool: &DbPool, userid: i64, questionid: i64) -> i64 {
    sqlx::query("INSERT INTO answers (userid, questionid, answer) VALUES (?, ?, ?)")
        .bind(userid)
        .bind(questionid)
        .bind("Through foreign-key delete actions.")
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

async fn count(pool: &DbPool, sql: &str) -> i64 {
    sqlx::query(sql)
        .fetch_one(pool)
        .await
        .unwrap()
        .get::<i64, _>(0)
}

#[tokio::test]
async fn engine_run_is_idempotent() {
    let pool = memory_pool().await;

    let first = evolve_schema(&pool).await.unwrap();
    assert_eq!(first.columns_added.len(), 2);
    let after_first = schema_snapshot(&pool).await;
    assert_eq!(after_first.len(), 5);

    let second = evolve_schema(&pool).await.unwrap();
    assert!(second.columns_added.is_empty());
    assert_eq!(schema_snapshot(&pool).await, after_first);
}

#[tokio::test]
async fn creation_in_registry_order_succeeds_with_fk_enforcement() {
    let pool = memory_pool().await;
    evolve_schema(&pool).await.unwrap();

    for spec in registry::tables() {
        assert!(table_exists(&pool, spec.name).await.unwrap(), "{} missing", spec.name);
    }

    // Foreign keys are enforced on this pool: a dangling reference fails.
    let dangling = sqlx::query("INSERT INTO answers (questionid, answer) VALUES (?, ?)")
        .bind(9999_i64)
        .bind("orphan")
        .execute(&pool)
        .await;
    assert!(dangling.is_err());
}

#[tokio::test]
async fn ensure_column_adds_exactly_once() {
    let pool = memory_pool().await;
    let specs = registry::tables();
    let users = specs.iter().find(|s| s.name == "users").unwrap();
    sqlx::query(&users.create_sql()).execute(&pool).await.unwrap();

    let added = ensure_column(&pool, "users", "password_reset_token", "VARCHAR(255) NULL")
        .await
        .unwrap();
    assert!(added);

    let again = ensure_column(&pool, "users", "password_reset_token", "VARCHAR(255) NULL")
        .await
        .unwrap();
    assert!(!again);

    let occurrences = count(
        &pool,
        "SELECT COUNT(*) FROM pragma_table_info('users') WHERE name = 'password_reset_token'",
    )
    .await;
    assert_eq!(occurrences, 1);
}

#[tokio::test]
async fn partial_schema_is_completed_without_data_loss() {
    let pool = memory_pool().await;

    // Simulate a crash after only the first table was created.
    let specs = registry::tables();
    let users = specs.iter().find(|s| s.name == "users").unwrap();
    sqlx::query(&users.create_sql()).execute(&pool).await.unwrap();
    let userid = insert_user(&pool, "survivor").await;

    evolve_schema(&pool).await.unwrap();

    for spec in registry::tables() {
        assert!(table_exists(&pool, spec.name).await.unwrap());
    }
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM users").await, 1);

    // The recovered tables resolve their references against existing data.
    let questionid = insert_question(&pool, userid).await;
    insert_answer(&pool, userid, questionid).await;
}

#[tokio::test]
async fn deleting_question_cascades_answers_votes_and_comments() {
    let pool = memory_pool().await;
    evolve_schema(&pool).await.unwrap();

    let userid = insert_user(&pool, "author").await;
    let questionid = insert_question(&pool, userid).await;
    let answerid = insert_answer(&pool, userid, questionid).await;

    sqlx::query("INSERT INTO answer_votes (answerid, userid, vote) VALUES (?, ?, ?)")
        .bind(answerid)
        .bind(userid)
        .bind(1_i16)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO answer_comments (answerid, userid, comment) VALUES (?, ?, ?)")
        .bind(answerid)
        .bind(userid)
        .bind("nice answer")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM questions WHERE questionid = ?")
        .bind(questionid)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answers").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answer_votes").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answer_comments").await, 0);
}

#[tokio::test]
async fn deleting_user_nulls_references_but_keeps_content() {
    let pool = memory_pool().await;
    evolve_schema(&pool).await.unwrap();

    let userid = insert_user(&pool, "departing").await;
    let questionid = insert_question(&pool, userid).await;
    let answerid = insert_answer(&pool, userid, questionid).await;
    sqlx::query("INSERT INTO answer_votes (answerid, userid, vote) VALUES (?, ?, ?)")
        .bind(answerid)
        .bind(userid)
        .bind(1_i16)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM users WHERE userid = ?")
        .bind(userid)
        .execute(&pool)
        .await
        .unwrap();

    // Content outlives the author.
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM questions").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answers").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answer_votes").await, 1);

    let orphaned = sqlx::query("SELECT userid FROM questions WHERE questionid = ?")
        .bind(questionid)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(orphaned.get::<Option<i64>, _>("userid").is_none());
}

#[tokio::test]
async fn duplicate_vote_is_rejected() {
    let pool = memory_pool().await;
    evolve_schema(&pool).await.unwrap();

    let userid = insert_user(&pool, "voter").await;
    let questionid = insert_question(&pool, userid).await;
    let answerid = insert_answer(&pool, userid, questionid).await;

    for (vote, expect_ok) in [(1_i16, true), (-1_i16, false)] {
        let result = sqlx::query("INSERT INTO answer_votes (answerid, userid, vote) VALUES (?, ?, ?)")
            .bind(answerid)
            .bind(userid)
            .bind(vote)
            .execute(&pool)
            .await;
        assert_eq!(result.is_ok(), expect_ok);
    }

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM answer_votes").await, 1);
}

#[tokio::test]
async fn bootstrap_reports_degraded_when_database_unreachable() {
    let tmp = TempDir::new().unwrap();
    let missing_dir = tmp.path().join("does-not-exist").join("forum.db");
    let config = DbConfig::sqlite(missing_dir.to_string_lossy());

    let startup = bootstrap(&config).await;

    assert!(startup.report.degraded);
    assert!(startup.db.is_none());
    assert!(startup.report.error.is_some());
}

#[tokio::test]
async fn bootstrap_succeeds_and_reports_added_columns() {
    let startup = bootstrap(&DbConfig::sqlite_memory()).await;

    assert!(!startup.report.degraded);
    assert!(startup.report.error.is_none());
    assert_eq!(startup.report.columns_added.len(), 2);

    let db = startup.db.unwrap();
    assert!(column_exists(db.pool(), "users", "password_reset_token")
        .await
        .unwrap());
    db.close().await;
}
