use crate::api::error::{err, ok};
use crate::api::helpers::{insert_new, required_str, wrap_row, OpError};
use crate::api::types::{AppState, Request};
use crate::query::{Query, StorageError};
use crate::session::{SessionStore, TOKEN_MARKER};
use rusqlite::Connection;
use serde_json::{json, Map, Value};

fn parts<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<(&'a Connection, &'a mut SessionStore), Value> {
    let AppState { db, session, .. } = state;
    match (db.as_ref(), session.as_mut()) {
        (Some(conn), Some(session)) => Ok((conn, session)),
        _ => Err(err(&req.id, "no_workspace", "select a workspace first", None)),
    }
}

fn domain_user(mut row: Map<String, Value>) -> Value {
    // The password never crosses the wire, hashed or not.
    row.remove("password");
    wrap_row(row)
}

fn login(
    conn: &Connection,
    session: &mut SessionStore,
    params: &Value,
) -> Result<Value, OpError> {
    let email = required_str(params, "email")?;
    // Demo-mode auth: a user row with this email is enough, the password is
    // not verified.
    let _password = required_str(params, "password")?;

    let rows = Query::table("users").eq("email", email).range(0, 0).fetch(conn)?;
    let Some(row) = rows.into_iter().next() else {
        return Err(StorageError {
            code: "invalid_credentials",
            message: "invalid credentials".to_string(),
            details: None,
        }
        .into());
    };

    let user = domain_user(row);
    session
        .establish(user.clone())
        .map_err(|e| OpError::bad(format!("failed to persist session: {}", e)))?;
    Ok(json!({ "user": user, "token": TOKEN_MARKER }))
}

fn register(
    conn: &Connection,
    session: &mut SessionStore,
    params: &Value,
) -> Result<Value, OpError> {
    let name = required_str(params, "name")?;
    let email = required_str(params, "email")?;
    let password = required_str(params, "password")?;
    let role = params
        .get("role")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("teacher");

    let mut row = Map::new();
    row.insert("name".to_string(), Value::String(name));
    row.insert("email".to_string(), Value::String(email));
    row.insert("password".to_string(), Value::String(password));
    row.insert("role".to_string(), Value::String(role.to_string()));
    let stored = insert_new(conn, "users", row)?;

    let user = domain_user(stored);
    session
        .establish(user.clone())
        .map_err(|e| OpError::bad(format!("failed to persist session: {}", e)))?;
    Ok(json!({ "user": user, "token": TOKEN_MARKER }))
}

fn me(conn: &Connection, session: &mut SessionStore) -> Option<Value> {
    session.resolve(|id| {
        Query::table("users")
            .eq("id", id)
            .fetch_optional(conn)
            .map(|row| row.is_some())
            .unwrap_or(false)
    })
}

fn handle_login(state: &mut AppState, req: &Request) -> Value {
    let (conn, session) = match parts(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match login(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_register(state: &mut AppState, req: &Request) -> Value {
    let (conn, session) = match parts(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match register(conn, session, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> Value {
    // Local state clears no matter what; a failed remote teardown must never
    // leave the UI stuck authenticated.
    if let Some(session) = state.session.as_mut() {
        session.clear();
    }
    ok(&req.id, json!({ "success": true }))
}

fn handle_me(state: &mut AppState, req: &Request) -> Value {
    let (conn, session) = match parts(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match me(conn, session) {
        Some(user) => ok(&req.id, user),
        None => err(&req.id, "not_authenticated", "no active session", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_login(state, req)),
        "auth.register" => Some(handle_register(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "auth.me" => Some(handle_me(state, req)),
        _ => None,
    }
}
