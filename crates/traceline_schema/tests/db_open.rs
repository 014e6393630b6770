use traceline_schema::db::{open_db, open_db_in_memory};

#[test]
fn in_memory_connection_enforces_foreign_keys() {
    let conn = open_db_in_memory().unwrap();

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn connections_carry_a_busy_timeout() {
    let conn = open_db_in_memory().unwrap();

    let busy_timeout_ms: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(busy_timeout_ms, 5_000);
}

#[test]
fn open_db_creates_a_usable_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("analysis.db");

    let conn = open_db(&db_path).unwrap();
    conn.execute_batch("CREATE TABLE sample (id INTEGER PRIMARY KEY);")
        .unwrap();
    conn.execute("INSERT INTO sample (id) VALUES (1);", [])
        .unwrap();

    assert!(db_path.exists());
}
