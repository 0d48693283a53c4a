use crate::api::helpers::{
    input_map, insert_new, name_lookup, opt_str, required_str, resolve_id_names, respond,
    update_existing, wrap_row, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Value};

fn parse_page(params: &Value, key: &str, default: u64) -> Result<u64, OpError> {
    match params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v
            .as_u64()
            .filter(|n| *n >= 1)
            .ok_or_else(|| OpError::bad(format!("{} must be a positive integer", key))),
    }
}

/// Paged student listing with search and batch-membership filtering. Batch
/// references come back denormalized as `{id, name}` pairs resolved against
/// the full batch lookup table, "Unknown" where a referenced batch no longer
/// exists.
fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let page = parse_page(params, "page", 1)?;
    let limit = parse_page(params, "limit", 20)?;

    let mut q = Query::table("students");
    if let Some(search) = opt_str(params, "search") {
        q = q.or_ilike(&["name", "email"], &search);
    }
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.contains("batch_ids", batch_id);
    }

    let count = q.count(conn)?;
    let from = (page - 1) * limit;
    let to = from + limit - 1;
    let rows = q.order("name", true).range(from, to).fetch(conn)?;

    let names = name_lookup(conn, "batches")?;
    let data: Vec<Value> = rows
        .into_iter()
        .map(|mut row| {
            let ids = row
                .get("batch_ids")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            row.insert("batch_ids".to_string(), resolve_id_names(&ids, &names));
            wrap_row(row)
        })
        .collect();

    let total_pages = count.div_ceil(limit);
    Ok(json!({ "data": data, "count": count, "totalPages": total_pages }))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("students").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    Ok(wrap_row(insert_new(conn, "students", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "students", &id, patch)?))
}

/// Plain row removal. Recording the exit is the caller's separate
/// `studentExits.create` call; the two are not transactional.
fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "students", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "students.list" => Some(respond(state, req, list)),
        "students.get" => Some(respond(state, req, get)),
        "students.create" => Some(respond(state, req, create)),
        "students.update" => Some(respond(state, req, update)),
        "students.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
