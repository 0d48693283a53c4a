use crate::api::helpers::{
    input_map, insert_new, opt_str, required_str, respond, update_existing, wrap_row, wrap_rows,
    OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Value};

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("batches").order("created_at", false);
    if let Some(academy_id) = opt_str(params, "academyId") {
        q = q.eq("academy_id", academy_id);
    }
    Ok(wrap_rows(q.fetch(conn)?))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("batches").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    if !input.contains_key("academy_id") {
        return Err(OpError::bad("missing input.academyId"));
    }
    Ok(wrap_row(insert_new(conn, "batches", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "batches", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    // References from students/syllabus/etc. are not cleaned up here; known
    // gap of the data model.
    query::delete(conn, "batches", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "batches.list" => Some(respond(state, req, list)),
        "batches.get" => Some(respond(state, req, get)),
        "batches.create" => Some(respond(state, req, create)),
        "batches.update" => Some(respond(state, req, update)),
        "batches.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
