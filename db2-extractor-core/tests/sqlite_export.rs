//! End-to-end exports against a SQLite database file.

#![cfg(feature = "sqlite")]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use db2_extractor_core::config::{Action, Config, CsvOptions, Parameters, QuoteStyle};
use db2_extractor_core::connection::sqlite::SqliteConnection;
use db2_extractor_core::{
    ActionResponse, Application, DbParameters, ErrorKind, ExtractorError, OutputPaths, Result,
    TableRef, TableSpec, connect,
};
use std::path::{Path, PathBuf};

const SEED: &str = "
    CREATE TABLE people (id INTEGER PRIMARY KEY, name TEXT, score REAL, note TEXT);
    INSERT INTO people VALUES (1, 'Ada', 9.5, 'likes \"quotes\", commas');
    INSERT INTO people VALUES (2, 'Grace', NULL, NULL);
    INSERT INTO people VALUES (3, 'Edsger', 7.25, 'line one
line two');
    CREATE TABLE empty_table (id INTEGER);
";

async fn seeded_database(dir: &Path) -> String {
    let path = dir.join("source.db").to_string_lossy().into_owned();
    let seed = SqliteConnection::create(&path).await.unwrap();
    seed.execute(SEED).await.unwrap();
    seed.close().await;
    path
}

fn tables_dir(data_dir: &Path) -> PathBuf {
    OutputPaths::tables_dir(data_dir)
}

async fn run(database: &str, data_dir: &Path, parameters: Parameters) -> Result<ActionResponse> {
    let db = DbParameters::sqlite(database);
    let connection = connect(&db).await?;
    let config = Config::new(Action::Run, parameters);
    Application::new(config, connection, data_dir).run().await
}

#[tokio::test]
async fn test_sqlite_table_export() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;

    let spec = TableSpec::for_table("people", TableRef::new("main", "people"), "in.c-main.people")
        .with_primary_key(["id"]);
    let parameters = Parameters::new(DbParameters::sqlite(&database)).with_tables(vec![spec]);

    let response = run(&database, dir.path(), parameters).await.unwrap();
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({"status": "success", "imported": ["in.c-main.people"]})
    );

    let paths = OutputPaths::new(&tables_dir(dir.path()), "in.c-main.people");
    let csv = std::fs::read_to_string(&paths.data).unwrap();
    assert_eq!(
        csv,
        "id,name,score,note\n\
         1,Ada,9.5,\"likes \"\"quotes\"\", commas\"\n\
         2,Grace,,\n\
         3,Edsger,7.25,\"line one\nline two\"\n"
    );

    // No SYSCAT catalog: destination, incremental and primary key only
    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&paths.manifest).unwrap()).unwrap();
    assert_eq!(
        manifest,
        serde_json::json!({
            "destination": "in.c-main.people",
            "incremental": false,
            "primary_key": ["id"],
        })
    );
}

#[tokio::test]
async fn test_sqlite_column_selection_and_dialect() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;

    let spec = TableSpec::for_table("people", TableRef::new("main", "people"), "names")
        .with_columns(["name", "id"]);
    let mut parameters = Parameters::new(DbParameters::sqlite(&database)).with_tables(vec![spec]);
    parameters.csv = CsvOptions {
        delimiter: ';',
        quote_style: QuoteStyle::Always,
    };

    run(&database, dir.path(), parameters).await.unwrap();

    let csv = std::fs::read_to_string(OutputPaths::new(&tables_dir(dir.path()), "names").data).unwrap();
    assert_eq!(
        csv,
        "\"name\";\"id\"\n\"Ada\";\"1\"\n\"Grace\";\"2\"\n\"Edsger\";\"3\"\n"
    );
}

#[tokio::test]
async fn test_sqlite_query_export_and_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;

    let tables = vec![
        TableSpec::for_query(
            "top",
            "SELECT name, score * 2 AS doubled FROM people WHERE score > 8",
            "top",
        ),
        TableSpec::for_query("nothing", "SELECT * FROM empty_table", "nothing"),
    ];
    let parameters = Parameters::new(DbParameters::sqlite(&database)).with_tables(tables);

    run(&database, dir.path(), parameters).await.unwrap();

    let tables_dir = tables_dir(dir.path());
    assert_eq!(
        std::fs::read_to_string(OutputPaths::new(&tables_dir, "top").data).unwrap(),
        "name,doubled\nAda,19\n"
    );
    assert_eq!(
        std::fs::read_to_string(OutputPaths::new(&tables_dir, "nothing").data).unwrap(),
        ""
    );
    assert!(OutputPaths::new(&tables_dir, "nothing").manifest.exists());
}

#[tokio::test]
async fn test_sqlite_failing_query_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;

    let tables = vec![
        TableSpec::for_query("bad", "SELECT * FROM no_such_table", "bad"),
        TableSpec::for_query("never", "SELECT * FROM people", "never"),
    ];
    let parameters = Parameters::new(DbParameters::sqlite(&database)).with_tables(tables);

    let error = run(&database, dir.path(), parameters).await.unwrap_err();

    assert!(matches!(error, ExtractorError::Query { .. }));
    assert!(error.to_string().starts_with("DB query [bad] failed"));
    assert_eq!(error.kind(), ErrorKind::User);
    assert!(!OutputPaths::new(&tables_dir(dir.path()), "never").data.exists());
}

#[tokio::test]
async fn test_sqlite_source_is_opened_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;

    let tables = vec![TableSpec::for_query(
        "write",
        "INSERT INTO people VALUES (4, 'Barbara', 1.0, NULL) RETURNING id",
        "write",
    )];
    let parameters = Parameters::new(DbParameters::sqlite(&database)).with_tables(tables);

    let error = run(&database, dir.path(), parameters).await.unwrap_err();
    assert!(matches!(error, ExtractorError::Query { .. }));
}

#[tokio::test]
async fn test_sqlite_test_connection_and_get_tables() {
    let dir = tempfile::tempdir().unwrap();
    let database = seeded_database(dir.path()).await;
    let db = DbParameters::sqlite(&database);

    let config = Config::new(Action::TestConnection, Parameters::new(db.clone()));
    let response = Application::new(config, connect(&db).await.unwrap(), dir.path())
        .run()
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"status":"success"}"#
    );

    let config = Config::new(Action::GetTables, Parameters::new(db.clone()));
    let error = Application::new(config, connect(&db).await.unwrap(), dir.path())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(error, ExtractorError::UnsupportedFeature { .. }));
}

#[tokio::test]
async fn test_sqlite_missing_database_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.db").to_string_lossy().into_owned();

    let error = connect(&DbParameters::sqlite(&missing)).await.err().unwrap();

    assert!(error.to_string().starts_with("Connection failed"));
    assert_eq!(error.exit_code(), 1);
}
