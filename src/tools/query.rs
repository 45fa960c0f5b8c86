use rusqlite::{Batch, Connection};
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};

/// One result row keyed by column name, in projection order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SecurityError,
    SqlError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecurityError => "SecurityError",
            Self::SqlError => "SQLError",
        }
    }
}

/// An expected failure reported in place of result rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub error: String,
    pub kind: ErrorKind,
}

impl ErrorRecord {
    pub fn security(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            kind: ErrorKind::SecurityError,
        }
    }

    pub fn sql(err: &rusqlite::Error) -> Self {
        Self {
            error: sqlite_message(err),
            kind: ErrorKind::SqlError,
        }
    }

    pub fn into_record(self) -> Record {
        let mut record = Record::new();
        record.insert("error".into(), Value::String(self.error));
        record.insert("type".into(), Value::String(self.kind.as_str().into()));
        record
    }

    /// The one-element sequence callers receive instead of rows.
    pub fn into_rows(self) -> Vec<Record> {
        vec![self.into_record()]
    }
}

/// SQLite's own message when there is one, without rusqlite's wrapping.
fn sqlite_message(err: &rusqlite::Error) -> String {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
        other => other.to_string(),
    }
}

pub fn sqlite_value_to_json(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}

/// Run `sql` and collect every row.
///
/// Column names come from the prepared statement, so any projection works.
/// Nothing is streamed or limited. Exactly one statement is accepted; a
/// second one fails with [`rusqlite::Error::MultipleStatement`] before
/// anything runs. Callers must have run the SQL through a
/// [`QueryGate`](crate::security::QueryGate) first.
pub fn execute(conn: &Connection, sql: &str) -> Result<Vec<Record>, rusqlite::Error> {
    let mut batch = Batch::new(conn, sql);
    let Some(mut stmt) = batch.next()? else {
        return Ok(Vec::new());
    };
    if batch.next()?.is_some() {
        return Err(rusqlite::Error::MultipleStatement);
    }

    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Record::with_capacity(column_names.len());
        for (i, name) in column_names.iter().enumerate() {
            record.insert(name.clone(), sqlite_value_to_json(row.get_ref(i)?));
        }
        records.push(record);
    }

    tracing::debug!("Query returned {} rows", records.len());
    Ok(records)
}

/// [`execute`], with store failures folded into an `SQLError` record.
pub fn execute_or_error_record(conn: &Connection, sql: &str) -> Vec<Record> {
    execute(conn, sql).unwrap_or_else(|e| {
        tracing::debug!("Query failed: {}", e);
        ErrorRecord::sql(&e).into_rows()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn games_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE games (id INTEGER PRIMARY KEY, title TEXT, rating REAL, cover BLOB);
             INSERT INTO games VALUES (1, 'Doom', 4.5, x'CAFE');
             INSERT INTO games VALUES (2, 'Myst', NULL, NULL);
             INSERT INTO games VALUES (3, 'Tetris', 5.0, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_select_literal_returns_one_record() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = execute(&conn, "SELECT 1 AS x").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Value::Object(rows[0].clone()), json!({"x": 1}));
    }

    #[test]
    fn test_rows_and_columns_keep_their_order() {
        let conn = games_db();
        let rows = execute(&conn, "SELECT title, id FROM games ORDER BY id DESC").unwrap();

        let titles: Vec<&Value> = rows.iter().map(|r| &r["title"]).collect();
        assert_eq!(titles, vec![&json!("Tetris"), &json!("Myst"), &json!("Doom")]);

        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["title", "id"]);
    }

    #[test]
    fn test_cell_values_are_converted() {
        let conn = games_db();
        let rows = execute(&conn, "SELECT * FROM games WHERE id <= 2 ORDER BY id").unwrap();

        assert_eq!(
            Value::Object(rows[0].clone()),
            json!({"id": 1, "title": "Doom", "rating": 4.5, "cover": "cafe"})
        );
        assert_eq!(
            Value::Object(rows[1].clone()),
            json!({"id": 2, "title": "Myst", "rating": null, "cover": null})
        );
    }

    #[test]
    fn test_expression_columns_use_query_metadata() {
        let conn = games_db();
        let rows = execute(&conn, "SELECT count(*), max(rating) AS best FROM games").unwrap();
        let keys: Vec<&String> = rows[0].keys().collect();
        assert_eq!(keys, vec!["count(*)", "best"]);
        assert_eq!(rows[0]["count(*)"], json!(3));
    }

    #[test]
    fn test_duplicate_column_names_keep_last_value() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = execute(&conn, "SELECT 1 AS a, 2 AS b, 3 AS a").unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0]["a"], json!(3));
        assert_eq!(rows[0].keys().next().map(String::as_str), Some("a"));
    }

    #[test]
    fn test_empty_result() {
        let conn = games_db();
        assert!(execute(&conn, "SELECT * FROM games WHERE id > 100").unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_becomes_sql_error_record() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = execute_or_error_record(&conn, "SELECT * FROM nonexistent_table");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["type"], json!("SQLError"));
        let message = rows[0]["error"].as_str().unwrap();
        assert!(message.contains("no such table"), "{message}");
    }

    #[test]
    fn test_malformed_sql_becomes_sql_error_record() {
        let conn = games_db();
        let rows = execute_or_error_record(&conn, "SELECT FROM WHERE");
        assert_eq!(rows[0]["type"], json!("SQLError"));
        assert!(!rows[0]["error"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_second_statement_is_sql_error_and_never_runs() {
        let conn = games_db();
        let rows = execute_or_error_record(&conn, "SELECT id FROM games; PRAGMA user_version = 7");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["type"], json!("SQLError"));
        assert!(!rows[0]["error"].as_str().unwrap().is_empty());

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 0);
    }

    #[test]
    fn test_trailing_semicolon_and_comment_are_one_statement() {
        let conn = games_db();
        let rows = execute(&conn, "SELECT count(*) AS n FROM games; -- all of them\n").unwrap();
        assert_eq!(Value::Object(rows[0].clone()), json!({"n": 3}));
    }

    #[test]
    fn test_invalid_utf8_text_is_replaced_lossily() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = execute(&conn, "SELECT CAST(x'ff41' AS TEXT) AS t").unwrap();
        assert_eq!(rows[0]["t"], json!("\u{fffd}A"));
    }

    #[test]
    fn test_security_error_record_shape() {
        let rows = ErrorRecord::security("Only SELECT queries are allowed").into_rows();
        assert_eq!(
            Value::Array(rows.into_iter().map(Value::Object).collect()),
            json!([{"error": "Only SELECT queries are allowed", "type": "SecurityError"}])
        );
    }

    #[test]
    fn test_non_finite_real_is_null() {
        assert_eq!(sqlite_value_to_json(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(sqlite_value_to_json(ValueRef::Real(f64::INFINITY)), Value::Null);
    }
}
