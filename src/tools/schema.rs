use rusqlite::Connection;

use crate::error::PeekError;

/// One row of `PRAGMA table_info`, serialized with SQLite's own column names.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnDescriptor {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub notnull: i64,
    pub dflt_value: Option<String>,
    pub pk: i64,
}

impl ColumnDescriptor {
    pub fn is_not_null(&self) -> bool {
        self.notnull != 0
    }

    /// `pk` is the column's 1-based position in the primary key, or 0.
    pub fn is_primary_key(&self) -> bool {
        self.pk > 0
    }
}

/// Names of every `table` entry in the catalog, in catalog order.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, PeekError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut tables = Vec::new();
    for row in rows {
        tables.push(row?);
    }
    Ok(tables)
}

/// Column metadata for `table_name`. An unknown table yields no columns.
///
/// The name is bound as a parameter of the `pragma_table_info` table-valued
/// function rather than spliced into a `PRAGMA` statement, so it is always
/// taken as a literal table name.
pub fn describe_table(conn: &Connection, table_name: &str) -> Result<Vec<ColumnDescriptor>, PeekError> {
    let mut stmt = conn.prepare(
        "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)",
    )?;
    let rows = stmt.query_map([table_name], |row| {
        Ok(ColumnDescriptor {
            cid: row.get(0)?,
            name: row.get(1)?,
            type_name: row.get(2)?,
            notnull: row.get(3)?,
            dflt_value: row.get(4)?,
            pk: row.get(5)?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}
