use crate::api::helpers::{
    current_week_start, date_only, input_map, insert_new, opt_str, required_str, respond,
    update_existing, wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{Map, Value};

fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let mut q = Query::table("weekly_plans").order("week_start", false);
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.eq("batch_id", batch_id);
    }
    Ok(wrap_rows(q.fetch(conn)?))
}

/// The plan for the running week (keyed by its Monday); no plan yet is a
/// null result, not an error.
fn get_current(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let batch_id = required_str(params, "batchId")?;
    let row = Query::table("weekly_plans")
        .eq("batch_id", batch_id)
        .eq("week_start", current_week_start())
        .fetch_optional(conn)?;
    Ok(row.map(wrap_row).unwrap_or(Value::Null))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let row = Query::table("weekly_plans").eq("id", id).fetch_one(conn)?;
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    for (col, wire) in [("batch_id", "batchId"), ("week_start", "weekStart")] {
        if !input.contains_key(col) {
            return Err(OpError::bad(format!("missing input.{}", wire)));
        }
    }
    Ok(wrap_row(insert_new(conn, "weekly_plans", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "weekly_plans", &id, patch)?))
}

/// Create-or-update resolved by looking up the (batch, week) unique key
/// first. The check and the write are two statements; a concurrent editor
/// can still race the create, in which case the unique constraint rejects
/// the loser.
fn upsert(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let batch_id = required_str(params, "batchId")?;
    let week_start = date_only(&required_str(params, "weekStart")?);
    let mut plan = input_map(params)?;

    let existing = Query::table("weekly_plans")
        .select(&["id"])
        .eq("batch_id", batch_id.as_str())
        .eq("week_start", week_start.as_str())
        .fetch_optional(conn)?;

    match existing.and_then(|row| row.get("id").and_then(|v| v.as_str()).map(String::from)) {
        Some(id) => Ok(wrap_row(update_existing(conn, "weekly_plans", &id, plan)?)),
        None => {
            plan.insert("batch_id".to_string(), Value::String(batch_id));
            plan.insert("week_start".to_string(), Value::String(week_start));
            Ok(wrap_row(insert_new(conn, "weekly_plans", plan)?))
        }
    }
}

fn mark_complete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut patch = Map::new();
    patch.insert("completed".to_string(), Value::Bool(true));
    Ok(wrap_row(update_existing(conn, "weekly_plans", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "weekly_plans", &id)?;
    Ok(serde_json::json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "weeklyPlans.list" => Some(respond(state, req, list)),
        "weeklyPlans.get" => Some(respond(state, req, get)),
        "weeklyPlans.getCurrent" => Some(respond(state, req, get_current)),
        "weeklyPlans.create" => Some(respond(state, req, create)),
        "weeklyPlans.update" => Some(respond(state, req, update)),
        "weeklyPlans.upsert" => Some(respond(state, req, upsert)),
        "weeklyPlans.markComplete" => Some(respond(state, req, mark_complete)),
        "weeklyPlans.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
