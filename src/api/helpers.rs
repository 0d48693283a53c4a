use crate::api::error::err;
use crate::api::types::{AppState, Request};
use crate::convert::{to_domain_keys, to_storage_keys};
use crate::query::{self, StorageError};
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Handler-level failure: either a parameter problem or a storage error
/// passed through with its own code.
pub enum OpError {
    Bad(String),
    Storage(StorageError),
}

impl OpError {
    pub fn bad(message: impl Into<String>) -> Self {
        OpError::Bad(message.into())
    }

    pub fn response(self, id: &str) -> Value {
        match self {
            OpError::Bad(message) => err(id, "bad_params", message, None),
            OpError::Storage(e) => err(id, e.code, e.message, e.details),
        }
    }
}

impl From<StorageError> for OpError {
    fn from(e: StorageError) -> Self {
        OpError::Storage(e)
    }
}

/// Run a connection-bound operation and shape its outcome into the response
/// envelope.
pub fn respond(
    state: &mut AppState,
    req: &Request,
    f: fn(&Connection, &Value) -> Result<Value, OpError>,
) -> Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match f(conn, &req.params) {
        Ok(result) => crate::api::error::ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn required_str(params: &Value, key: &str) -> Result<String, OpError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OpError::bad(format!("missing {}", key)))
}

pub fn opt_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The `input` object of a create/update call, rewritten to storage keys.
/// Identifier fields are never client-supplied.
pub fn input_map(params: &Value) -> Result<Map<String, Value>, OpError> {
    let raw = params
        .get("input")
        .cloned()
        .ok_or_else(|| OpError::bad("missing input"))?;
    if !raw.is_object() {
        return Err(OpError::bad("input must be an object"));
    }
    let mut map = match to_storage_keys(raw) {
        Value::Object(m) => m,
        _ => unreachable!(),
    };
    map.remove("id");
    map.remove("_id");
    map.remove("created_at");
    Ok(map)
}

/// Empty-string optionals become null, matching the form boundary's habit of
/// sending "" for untouched fields.
pub fn clean_optional(map: &mut Map<String, Value>, fields: &[&str]) {
    for field in fields {
        if let Some(v) = map.get(*field) {
            if v.as_str().map(|s| s.is_empty()).unwrap_or(false) {
                map.insert(field.to_string(), Value::Null);
            }
        }
    }
}

pub fn wrap_row(row: Map<String, Value>) -> Value {
    to_domain_keys(Value::Object(row))
}

pub fn wrap_rows(rows: Vec<Map<String, Value>>) -> Value {
    Value::Array(rows.into_iter().map(wrap_row).collect())
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Date-only normalization: timestamps lose their time-of-day, date strings
/// pass through.
pub fn date_only(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    raw.split('T').next().unwrap_or(raw).to_string()
}

pub fn today() -> String {
    chrono::Local::now().date_naive().to_string()
}

/// Monday of the current ISO week.
pub fn current_week_start() -> String {
    let today = chrono::Local::now().date_naive();
    let monday = today
        - chrono::Duration::days(chrono::Datelike::weekday(&today).num_days_from_monday() as i64);
    monday.to_string()
}

pub fn insert_new(
    conn: &Connection,
    table: &str,
    mut row: Map<String, Value>,
) -> Result<Map<String, Value>, StorageError> {
    row.insert("id".to_string(), Value::String(new_id()));
    row.insert("created_at".to_string(), Value::String(now_iso()));
    query::insert(conn, table, row)
}

pub fn update_existing(
    conn: &Connection,
    table: &str,
    id: &str,
    mut patch: Map<String, Value>,
) -> Result<Map<String, Value>, StorageError> {
    patch.insert("updated_at".to_string(), Value::String(now_iso()));
    query::update(conn, table, id, patch)
}

/// id -> name lookup over a whole table, used for the client-side joins.
/// Scales only to small tables; acceptable for a single academy's batches
/// and students.
pub fn name_lookup(
    conn: &Connection,
    table: &str,
) -> Result<std::collections::HashMap<String, String>, StorageError> {
    let rows = query::Query::table(table).select(&["id", "name"]).fetch(conn)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id")?.as_str()?.to_string();
            let name = row.get("name")?.as_str()?.to_string();
            Some((id, name))
        })
        .collect())
}

/// Resolve a list of bare ids into `{id, name}` pairs, "Unknown" for ids the
/// lookup cannot resolve.
pub fn resolve_id_names(
    ids: &[Value],
    names: &std::collections::HashMap<String, String>,
) -> Value {
    Value::Array(
        ids.iter()
            .filter_map(|v| v.as_str())
            .map(|id| {
                json!({
                    "id": id,
                    "name": names.get(id).cloned().unwrap_or_else(|| "Unknown".to_string())
                })
            })
            .collect(),
    )
}
