use crate::api::helpers::{
    clean_optional, input_map, insert_new, required_str, respond, update_existing, wrap_row,
    wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Value};

const OPTIONAL_FIELDS: [&str; 3] = ["batch_id", "description", "category"];

fn list(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let rows = Query::table("documents")
        .order("created_at", false)
        .fetch(conn)?;
    Ok(wrap_rows(rows))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("documents").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut input = input_map(params)?;
    clean_optional(&mut input, &OPTIONAL_FIELDS);
    Ok(wrap_row(insert_new(conn, "documents", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut patch = input_map(params)?;
    clean_optional(&mut patch, &OPTIONAL_FIELDS);
    Ok(wrap_row(update_existing(conn, "documents", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "documents", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "documents.list" => Some(respond(state, req, list)),
        "documents.get" => Some(respond(state, req, get)),
        "documents.create" => Some(respond(state, req, create)),
        "documents.update" => Some(respond(state, req, update)),
        "documents.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
