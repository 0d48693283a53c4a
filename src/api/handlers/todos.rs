use crate::api::helpers::{
    clean_optional, input_map, insert_new, opt_str, required_str, respond, update_existing,
    wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

const OPTIONAL_FIELDS: [&str; 3] = ["batch_id", "description", "due_date"];

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("todos").order("created_at", false);
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    Ok(wrap_rows(q.fetch(conn)?))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("todos").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut input = input_map(params)?;
    clean_optional(&mut input, &OPTIONAL_FIELDS);
    Ok(wrap_row(insert_new(conn, "todos", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut patch = input_map(params)?;
    clean_optional(&mut patch, &OPTIONAL_FIELDS);
    Ok(wrap_row(update_existing(conn, "todos", &id, patch)?))
}

fn toggle(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let current = Query::table("todos")
        .select(&["completed"])
        .eq("id", id.as_str())
        .fetch_one(conn)?;
    let completed = current
        .get("completed")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let mut patch = Map::new();
    patch.insert("completed".to_string(), Value::Bool(!completed));
    Ok(wrap_row(update_existing(conn, "todos", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "todos", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "todos.list" => Some(respond(state, req, list)),
        "todos.get" => Some(respond(state, req, get)),
        "todos.create" => Some(respond(state, req, create)),
        "todos.update" => Some(respond(state, req, update)),
        "todos.toggle" => Some(respond(state, req, toggle)),
        "todos.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
