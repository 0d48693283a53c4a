use crate::api::helpers::{
    input_map, insert_new, name_lookup, opt_str, required_str, respond, wrap_row, wrap_rows,
    OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use crate::rollup;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

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

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("test_results")
        .join_one("students", "student_id", "name")
        .order("test_date", false);
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    if let Some(student_id) = opt_str(params, "studentId") {
        q = q.eq("student_id", student_id);
    }
    if let Some(subject) = opt_str(params, "subject") {
        q = q.eq("subject", subject);
    }
    let rows = q.fetch(conn)?;
    Ok(wrap_rows(rows.into_iter().map(flatten_student_ref).collect()))
}

/// Marks above totalMarks are accepted as-is (bonus-mark entries); the
/// store does not police the ratio.
fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    Ok(wrap_row(insert_new(conn, "test_results", input)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "test_results", &id)?;
    Ok(json!({ "success": true }))
}

/// Rank by summed marks over summed total marks per student; see
/// `rollup::leaderboard` for the weighting.
fn get_leaderboard(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("test_results").select(&["student_id", "marks", "total_marks"]);
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    if let Some(subject) = opt_str(params, "subject") {
        q = q.eq("subject", subject);
    }
    let rows = q.fetch(conn)?;

    let triples: Vec<(String, f64, f64)> = rows
        .iter()
        .filter_map(|row| {
            let student_id = row.get("student_id")?.as_str()?.to_string();
            let marks = row.get("marks")?.as_f64()?;
            let total_marks = row.get("total_marks")?.as_f64()?;
            Some((student_id, marks, total_marks))
        })
        .collect();
    let names = name_lookup(conn, "students")?;
    let board = rollup::leaderboard(&triples, &names);
    Ok(serde_json::to_value(board).unwrap_or(Value::Null))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "results.list" => Some(respond(state, req, list)),
        "results.create" => Some(respond(state, req, create)),
        "results.delete" => Some(respond(state, req, delete)),
        "results.getLeaderboard" => Some(respond(state, req, get_leaderboard)),
        _ => None,
    }
}
