use crate::api::helpers::{
    input_map, insert_new, name_lookup, opt_str, required_str, resolve_id_names, respond,
    update_existing, wrap_row, wrap_rows, OpError,
};
use crate::api::types::{AppState, Request};
use crate::query::{self, Query};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

/// An empty target list is a broadcast: it reaches every batch, so a
/// batch-scoped listing keeps it alongside the explicitly targeted rows.
fn list(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let batch_filter = opt_str(params, "batchId");
    let rows = Query::table("announcements")
        .order("created_at", false)
        .fetch(conn)?;
    let names = name_lookup(conn, "batches")?;

    let mut out: Vec<Map<String, Value>> = Vec::new();
    for mut row in rows {
        let raw_targets = row
            .get("target_batch_ids")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        if let Some(batch_id) = &batch_filter {
            let targeted = raw_targets.is_empty()
                || raw_targets.iter().any(|v| v.as_str() == Some(batch_id));
            if !targeted {
                continue;
            }
        }
        row.insert(
            "target_batch_ids".to_string(),
            resolve_id_names(&raw_targets, &names),
        );
        out.push(row);
    }
    Ok(wrap_rows(out))
}

fn get(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let mut row = Query::table("announcements").eq("id", id).fetch_one(conn)?;
    let raw_targets = row
        .get("target_batch_ids")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let names = name_lookup(conn, "batches")?;
    row.insert(
        "target_batch_ids".to_string(),
        resolve_id_names(&raw_targets, &names),
    );
    Ok(wrap_row(row))
}

fn create(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let input = input_map(params)?;
    Ok(wrap_row(insert_new(conn, "announcements", input)?))
}

fn update(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let patch = input_map(params)?;
    Ok(wrap_row(update_existing(conn, "announcements", &id, patch)?))
}

/// Read-negate-write, same documented race as the other toggles.
fn toggle_viewed(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    let current = Query::table("announcements")
        .select(&["viewed"])
        .eq("id", id.as_str())
        .fetch_one(conn)?;
    let viewed = current.get("viewed").and_then(|v| v.as_bool()).unwrap_or(false);
    let mut patch = Map::new();
    patch.insert("viewed".to_string(), Value::Bool(!viewed));
    Ok(wrap_row(update_existing(conn, "announcements", &id, patch)?))
}

fn delete(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let id = required_str(params, "id")?;
    query::delete(conn, "announcements", &id)?;
    Ok(json!({ "success": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "announcements.list" => Some(respond(state, req, list)),
        "announcements.get" => Some(respond(state, req, get)),
        "announcements.create" => Some(respond(state, req, create)),
        "announcements.update" => Some(respond(state, req, update)),
        "announcements.toggleViewed" => Some(respond(state, req, toggle_viewed)),
        "announcements.delete" => Some(respond(state, req, delete)),
        _ => None,
    }
}
