use crate::api::helpers::{
    input_map, insert_new, opt_str, required_str, respond, update_existing, wrap_row, wrap_rows,
    OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use crate::rollup;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

fn filtered(params: &Value) -> Query {
    let mut q = Query::table("syllabus");
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    if let Some(subject) = opt_str(params, "subject") {
        q = q.eq("subject", subject);
    }
    q
}

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let rows = filtered(params).order("sort_order", true).fetch(conn)?;
    Ok(wrap_rows(rows))
}

/// Completion ratio over the filtered topics as a whole-number percent;
/// an empty syllabus reports zero rather than failing.
fn get_progress(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let rows = filtered(params).select(&["id", "completed"]).fetch(conn)?;
    let progress = rollup::syllabus_progress(
        rows.iter()
            .map(|row| row.get("completed").and_then(|v| v.as_bool()).unwrap_or(false)),
    );
    Ok(serde_json::to_value(progress).unwrap_or(Value::Null))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("syllabus").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    Ok(wrap_row(insert_new(conn, "syllabus", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "syllabus", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "syllabus", &id)?;
    Ok(json!({ "success": true }))
}

/// Read-negate-write; two sessions toggling at once can lose one update.
/// Accepted for the single-teacher usage pattern.
fn toggle(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let current = Query::table("syllabus")
        .select(&["completed"])
        .eq("id", id.as_str())
        .fetch_one(conn)?;
    let completed = current
        .get("completed")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let mut patch = Map::new();
    patch.insert("completed".to_string(), Value::Bool(!completed));
    Ok(wrap_row(update_existing(conn, "syllabus", &id, patch)?))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "syllabus.list" => Some(respond(state, req, list)),
        "syllabus.get" => Some(respond(state, req, get)),
        "syllabus.getProgress" => Some(respond(state, req, get_progress)),
        "syllabus.create" => Some(respond(state, req, create)),
        "syllabus.update" => Some(respond(state, req, update)),
        "syllabus.delete" => Some(respond(state, req, delete)),
        "syllabus.toggle" => Some(respond(state, req, toggle)),
        _ => None,
    }
}
