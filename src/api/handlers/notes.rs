use crate::api::helpers::{
    clean_optional, input_map, insert_new, required_str, respond, update_existing, wrap_row,
    wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

/// The optional batch association comes back as a `{id, name}` pair, or null
/// for unattached notes.
fn flatten_batch_ref(mut row: Map<String, Value>) -> Map<String, Value> {
    let name = row
        .remove("batches")
        .and_then(|nested| nested.get("name").cloned())
        .unwrap_or(Value::Null);
    let batch_ref = match row.get("batch_id").and_then(|v| v.as_str()) {
        Some(batch_id) => json!({ "id": batch_id, "name": name }),
        None => Value::Null,
    };
    row.insert("batch_id".to_string(), batch_ref);
    row
}

fn list(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let rows = Query::table("notes")
        .join_one("batches", "batch_id", "name")
        .order("updated_at", false)
        .fetch(conn)?;
    Ok(wrap_rows(rows.into_iter().map(flatten_batch_ref).collect()))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("notes")
        .join_one("batches", "batch_id", "name")
        .eq("id", id)
        .fetch_one(conn)?;
    Ok(wrap_row(flatten_batch_ref(row)))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut input = input_map(params)?;
    clean_optional(&mut input, &["batch_id", "content"]);
    Ok(wrap_row(insert_new(conn, "notes", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut patch = input_map(params)?;
    clean_optional(&mut patch, &["batch_id", "content"]);
    Ok(wrap_row(update_existing(conn, "notes", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "notes", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "notes.list" => Some(respond(state, req, list)),
        "notes.get" => Some(respond(state, req, get)),
        "notes.create" => Some(respond(state, req, create)),
        "notes.update" => Some(respond(state, req, update)),
        "notes.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
