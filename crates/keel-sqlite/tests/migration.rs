//! Database-open migration against in-memory SQLite.

use keel_core::declaration::{ColumnAnnotation, FieldDeclaration, ModelDeclaration};
use keel_core::migration::MigrationDecision;
use keel_core::schema::Schema;
use keel_sqlite::{DatabaseOptions, DigestStore, MigrationError, SchemaMigrator};
use sqlx::sqlite::SqlitePool;

async fn create_test_pool() -> SqlitePool {
    DatabaseOptions::default()
        .connect()
        .await
        .expect("Failed to create test pool")
}

fn text_column(name: &str) -> FieldDeclaration {
    FieldDeclaration::column(name, "String", ColumnAnnotation::default())
}

fn library_schema(with_isbn: bool) -> Schema {
    let author = ModelDeclaration::new("Author")
        .field(FieldDeclaration::primary_key("id", "i64"))
        .field(text_column("name"));
    let mut book = ModelDeclaration::new("Book")
        .field(FieldDeclaration::primary_key("id", "i64"))
        .field(text_column("title"))
        .field(FieldDeclaration::column(
            "authorId",
            "i64",
            ColumnAnnotation {
                references: Some("Author".to_string()),
                ..ColumnAnnotation::default()
            },
        ));
    if with_isbn {
        book = book.field(FieldDeclaration::column(
            "isbn",
            "Option<String>",
            ColumnAnnotation {
                unique: true,
                ..ColumnAnnotation::default()
            },
        ));
    }
    Schema::from_declarations(&[author, book]).unwrap()
}

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap();
    rows.into_iter().map(|(name,)| name).collect()
}

async fn stored_digest(pool: &SqlitePool) -> Option<String> {
    let mut conn = pool.acquire().await.unwrap();
    DigestStore::load(&mut conn).await.unwrap().map(|d| d.value)
}

#[tokio::test]
async fn test_first_open_creates_schema() {
    let pool = create_test_pool().await;
    let schema = library_schema(false);

    let report = SchemaMigrator::new(&schema).migrate(&pool).await.unwrap();
    assert_eq!(report.decision, MigrationDecision::FullRecreate);
    assert_eq!(report.stored_digest, None);
    assert!(report.dropped.is_empty());
    assert!(report.applied());
    let expected: Vec<String> = schema.statements().map(str::to_string).collect();
    assert_eq!(report.statements, expected);

    assert_eq!(table_names(&pool).await, vec!["Author", "Book", "keel_metadata"]);
    assert_eq!(stored_digest(&pool).await.as_deref(), Some(schema.digest().as_str()));
}

#[tokio::test]
async fn test_reopen_with_same_schema_is_a_no_op() {
    let pool = create_test_pool().await;
    let schema = library_schema(false);
    SchemaMigrator::new(&schema).migrate(&pool).await.unwrap();

    sqlx::query("INSERT INTO \"Author\" (\"name\") VALUES ('Le Guin')")
        .execute(&pool)
        .await
        .unwrap();

    let report = SchemaMigrator::new(&library_schema(false))
        .migrate(&pool)
        .await
        .unwrap();
    assert_eq!(report.decision, MigrationDecision::NoMigrationNeeded);
    assert!(report.statements.is_empty());
    assert!(!report.applied());

    let (authors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM \"Author\"")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(authors, 1);
}

#[tokio::test]
async fn test_changed_schema_recreates_every_table() {
    let pool = create_test_pool().await;
    SchemaMigrator::new(&library_schema(false))
        .migrate(&pool)
        .await
        .unwrap();
    sqlx::query("CREATE TABLE \"Scratch\" (x INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO \"Author\" (\"name\") VALUES ('Le Guin')")
        .execute(&pool)
        .await
        .unwrap();

    let schema = library_schema(true);
    let report = SchemaMigrator::new(&schema).migrate(&pool).await.unwrap();
    assert_eq!(report.decision, MigrationDecision::FullRecreate);
    assert!(report.stored_digest.is_some());
    assert_eq!(report.dropped, vec!["Author", "Book", "Scratch"]);
    assert_eq!(report.statements[0], "DROP TABLE IF EXISTS \"Author\"");

    assert_eq!(table_names(&pool).await, vec!["Author", "Book", "keel_metadata"]);
    assert_eq!(stored_digest(&pool).await.as_deref(), Some(schema.digest().as_str()));

    let (authors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM \"Author\"")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(authors, 0);
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let pool = create_test_pool().await;
    let schema = library_schema(false);

    let report = SchemaMigrator::new(&schema)
        .dry_run(true)
        .migrate(&pool)
        .await
        .unwrap();
    assert_eq!(report.decision, MigrationDecision::FullRecreate);
    assert!(report.dry_run);
    assert!(!report.applied());
    assert_eq!(report.statements.len(), schema.statements().count());

    assert!(table_names(&pool).await.is_empty());
    assert_eq!(stored_digest(&pool).await, None);
}

#[tokio::test]
async fn test_plan_does_not_touch_the_database() {
    let pool = create_test_pool().await;
    let schema = library_schema(false);

    let plan = SchemaMigrator::new(&schema).plan(&pool).await.unwrap();
    assert_eq!(plan.decision, MigrationDecision::FullRecreate);
    assert!(table_names(&pool).await.is_empty());
}

#[tokio::test]
async fn test_failing_statement_rolls_back() {
    let pool = create_test_pool().await;
    let alpha = ModelDeclaration::new("Alpha").field(FieldDeclaration::primary_key("id", "i64"));
    let beta = ModelDeclaration::new("Beta")
        .field(FieldDeclaration::primary_key("id", "i64"))
        .field(FieldDeclaration::column(
            "broken",
            "i64",
            ColumnAnnotation {
                default_expr: Some("(1 +".to_string()),
                ..ColumnAnnotation::default()
            },
        ));
    let schema = Schema::from_declarations(&[alpha, beta]).unwrap();

    let err = SchemaMigrator::new(&schema).migrate(&pool).await.unwrap_err();
    match err {
        MigrationError::Statement { sql, .. } => {
            assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"Beta\""));
        }
        other => panic!("expected a statement error, got {other:?}"),
    }

    assert!(table_names(&pool).await.is_empty());
    assert_eq!(stored_digest(&pool).await, None);

    let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[tokio::test]
async fn test_foreign_keys_restored_after_migration() {
    let pool = create_test_pool().await;
    SchemaMigrator::new(&library_schema(false))
        .migrate(&pool)
        .await
        .unwrap();

    let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(foreign_keys, 1);

    let orphan = sqlx::query("INSERT INTO \"Book\" (\"title\", \"authorId\") VALUES ('Orphan', 42)")
        .execute(&pool)
        .await;
    assert!(orphan.is_err());
}
