use crate::api::helpers::{
    clean_optional, input_map, insert_new, opt_str, required_str, respond, update_existing,
    wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Value};

const OPTIONAL_FIELDS: [&str; 2] = ["batch_id", "description"];

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("events").order("date", true);
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    if let Some(start) = opt_str(params, "startDate") {
        q = q.gte("date", start);
    }
    if let Some(end) = opt_str(params, "endDate") {
        q = q.lte("date", end);
    }
    Ok(wrap_rows(q.fetch(conn)?))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("events").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut input = input_map(params)?;
    clean_optional(&mut input, &OPTIONAL_FIELDS);
    Ok(wrap_row(insert_new(conn, "events", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut patch = input_map(params)?;
    clean_optional(&mut patch, &OPTIONAL_FIELDS);
    Ok(wrap_row(update_existing(conn, "events", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "events", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "events.list" => Some(respond(state, req, list)),
        "events.get" => Some(respond(state, req, get)),
        "events.create" => Some(respond(state, req, create)),
        "events.update" => Some(respond(state, req, update)),
        "events.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
