use anyhow::{bail, Result};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::{Map, Value as JsonValue};

/// Column layout of a table whose rows travel as JSON objects, the same
/// shape the hosted REST backend returns.
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
    /// Stored as 0/1, exposed as JSON booleans
    pub bool_columns: &'static [&'static str],
    /// Stored as JSON text
    pub json_columns: &'static [&'static str],
}

impl TableSpec {
    pub fn select_list(&self, alias: &str) -> String {
        self.columns
            .iter()
            .map(|column| format!("{}.{}", alias, column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Read `columns` starting at `offset` into a JSON object
    pub fn row_to_json(&self, row: &Row<'_>, offset: usize) -> rusqlite::Result<Map<String, JsonValue>> {
        let mut object = Map::new();
        for (i, column) in self.columns.iter().enumerate() {
            let value = match row.get_ref(offset + i)? {
                ValueRef::Null => JsonValue::Null,
                ValueRef::Integer(n) if self.bool_columns.contains(column) => JsonValue::Bool(n != 0),
                ValueRef::Integer(n) => JsonValue::from(n),
                ValueRef::Real(f) => JsonValue::from(f),
                ValueRef::Text(bytes) => {
                    let text = String::from_utf8_lossy(bytes).into_owned();
                    if self.json_columns.contains(column) {
                        serde_json::from_str(&text).unwrap_or(JsonValue::Null)
                    } else {
                        JsonValue::String(text)
                    }
                }
                ValueRef::Blob(_) => JsonValue::Null,
            };
            object.insert(column.to_string(), value);
        }
        Ok(object)
    }
}

fn to_sql_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or_default()),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

pub fn fetch_by_id(conn: &Connection, table: &TableSpec, id: &str) -> Result<Option<JsonValue>> {
    let sql = format!(
        "SELECT {} FROM {} t WHERE t.id = ?",
        table.select_list("t"),
        table.name
    );
    let row = conn
        .query_row(&sql, [id], |row| table.row_to_json(row, 0))
        .optional()?;
    Ok(row.map(JsonValue::Object))
}

/// Insert the row or update only the columns present in `payload`. Keys
/// outside the table's column list are rejected.
pub fn upsert(conn: &Connection, table: &TableSpec, payload: &Map<String, JsonValue>) -> Result<()> {
    if !payload.contains_key("id") {
        bail!("upsert into {} requires an id", table.name);
    }
    if let Some(unknown) = payload.keys().find(|key| !table.columns.contains(&key.as_str())) {
        bail!("column {} does not exist on {}", unknown, table.name);
    }

    let columns: Vec<&str> = payload.keys().map(String::as_str).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let updates: Vec<String> = columns
        .iter()
        .filter(|column| **column != "id")
        .map(|column| format!("{0} = excluded.{0}", column))
        .collect();
    let conflict = if updates.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", updates.join(", "))
    };

    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) {}",
        table.name,
        columns.join(", "),
        placeholders,
        conflict
    );
    let values: Vec<Value> = payload.values().map(to_sql_value).collect();
    conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOTES: TableSpec = TableSpec {
        name: "notes",
        columns: &["id", "body", "pinned", "tags"],
        bool_columns: &["pinned"],
        json_columns: &["tags"],
    };

    fn notes_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE notes (id VARCHAR PRIMARY KEY, body VARCHAR, pinned BOOLEAN, tags VARCHAR)",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_upsert_keeps_columns_not_in_payload() {
        let conn = notes_conn();
        let first = json!({ "id": "a", "body": "olá", "pinned": true, "tags": ["x"] });
        upsert(&conn, &NOTES, first.as_object().unwrap()).unwrap();

        let second = json!({ "id": "a", "pinned": false });
        upsert(&conn, &NOTES, second.as_object().unwrap()).unwrap();

        let row = fetch_by_id(&conn, &NOTES, "a").unwrap().unwrap();
        assert_eq!(row["body"], "olá");
        assert_eq!(row["pinned"], false);
        assert_eq!(row["tags"], json!(["x"]));
    }

    #[test]
    fn test_upsert_rejects_unknown_column() {
        let conn = notes_conn();
        let payload = json!({ "id": "a", "owner": "x" });
        assert!(upsert(&conn, &NOTES, payload.as_object().unwrap()).is_err());
        assert!(fetch_by_id(&conn, &NOTES, "missing").unwrap().is_none());
    }
}
