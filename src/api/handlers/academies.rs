use crate::api::helpers::{
    input_map, insert_new, required_str, respond, update_existing, wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Value};

fn list(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let rows = Query::table("academies")
        .order("created_at", false)
        .fetch(conn)?;
    Ok(wrap_rows(rows))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("academies").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    Ok(wrap_row(insert_new(conn, "academies", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "academies", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    // Batches cascade with the academy at the store level.
    query::delete(conn, "academies", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "academies.list" => Some(respond(state, req, list)),
        "academies.get" => Some(respond(state, req, get)),
        "academies.create" => Some(respond(state, req, create)),
        "academies.update" => Some(respond(state, req, update)),
        "academies.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
