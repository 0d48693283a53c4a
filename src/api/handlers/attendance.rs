use crate::api::helpers::{
    date_only, new_id, now_iso, opt_str, required_str, respond, wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

const CONFLICT_KEY: [&str; 3] = ["student_id", "batch_id", "date"];

/// Flatten the relation-select shape (`students: {name}`) into the
/// denormalized `studentId: {id, name}` reference the dashboard expects.
fn flatten_student_ref(mut row: Map<String, Value>) -> Map<String, Value> {
    let name = row
        .remove("students")
        .and_then(|nested| nested.get("name").cloned())
        .unwrap_or(Value::Null);
    let student_id = row
        .get("student_id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    row.insert(
        "student_id".to_string(),
        json!({ "id": student_id, "name": name }),
    );
    row
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("attendance").join_one("students", "student_id", "name");
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    if let Some(student_id) = opt_str(params, "studentId") {
        q = q.eq("student_id", student_id);
    }
    if let Some(date) = opt_str(params, "date") {
        q = q.eq("date", date_only(&date));
    }
    let rows = q.fetch(conn)?;
    Ok(wrap_rows(rows.into_iter().map(flatten_student_ref).collect()))
}

fn upsert_rows(
    conn: &Connection,
    batch_id: &str,
    date: &str,
    records: &[Value],
) -> Result<Vec<Map<String, Value>>, OpError> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let student_id = required_str(record, "studentId")?;
        let status = required_str(record, "status")?;
        let mut row = Map::new();
        row.insert("id".to_string(), Value::String(new_id()));
        row.insert("student_id".to_string(), Value::String(student_id));
        row.insert("batch_id".to_string(), Value::String(batch_id.to_string()));
        row.insert("date".to_string(), Value::String(date.to_string()));
        row.insert("status".to_string(), Value::String(status));
        row.insert("updated_at".to_string(), Value::String(now_iso()));
        rows.push(row);
    }
    Ok(query::upsert(conn, "attendance", rows, &CONFLICT_KEY)?)
}

/// Replace-or-insert every record for one (batch, date) in a single
/// transaction; re-marking a day overwrites statuses instead of stacking
/// duplicate rows.
fn mark_bulk(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let batch_id = required_str(params, "batchId")?;
    let date = date_only(&required_str(params, "date")?);
    let records = params
        .get("records")
        .and_then(|v| v.as_array())
        .ok_or_else(|| OpError::bad("missing records"))?;
    let stored = upsert_rows(conn, &batch_id, &date, records)?;
    Ok(wrap_rows(stored))
}

fn mark_single(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let batch_id = required_str(params, "batchId")?;
    let date = date_only(&required_str(params, "date")?);
    let record = json!({
        "studentId": required_str(params, "studentId")?,
        "status": required_str(params, "status")?,
    });
    let stored = upsert_rows(conn, &batch_id, &date, &[record])?;
    let row = stored
        .into_iter()
        .next()
        .ok_or_else(|| OpError::bad("upsert returned no row"))?;
    Ok(wrap_row(row))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "attendance", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "attendance.get" => Some(respond(state, req, get)),
        "attendance.markBulk" => Some(respond(state, req, mark_bulk)),
        "attendance.markSingle" => Some(respond(state, req, mark_single)),
        "attendance.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
