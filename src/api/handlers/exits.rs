use crate::api::helpers::{
    input_map, insert_new, required_str, respond, wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use crate::rollup;
use rusqlite::Connection;
use serde_json::{json, Value};

fn list(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let rows = Query::table("student_exits")
        .order("exit_date", false)
        .fetch(conn)?;
    Ok(wrap_rows(rows))
}

/// One write at student removal time; the name and batch list are snapshots
/// so the record stays meaningful after the student row is gone.
fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    for (col, wire) in [
        ("student_id", "studentId"),
        ("student_name", "studentName"),
        ("exit_type", "exitType"),
        ("exit_date", "exitDate"),
    ] {
        if !input.contains_key(col) {
            return Err(OpError::bad(format!("missing input.{}", wire)));
        }
    }
    Ok(wrap_row(insert_new(conn, "student_exits", input)?))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("student_exits").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

/// Mistaken entries can be withdrawn; there is no update, the record is
/// otherwise immutable.
fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "student_exits", &id)?;
    Ok(json!({ "success": true }))
}

fn get_stats(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let rows = Query::table("student_exits")
        .select(&["exit_type"])
        .fetch(conn)?;
    let stats = rollup::exit_stats(
        rows.iter()
            .filter_map(|row| row.get("exit_type").and_then(|v| v.as_str())),
    );
    Ok(serde_json::to_value(stats).unwrap_or(Value::Null))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "studentExits.list" => Some(respond(state, req, list)),
        "studentExits.get" => Some(respond(state, req, get)),
        "studentExits.create" => Some(respond(state, req, create)),
        "studentExits.delete" => Some(respond(state, req, delete)),
        "studentExits.getStats" => Some(respond(state, req, get_stats)),
        _ => None,
    }
}
