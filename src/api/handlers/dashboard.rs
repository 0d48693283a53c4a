use crate::api::helpers::{respond, today, OpError};
use crate::api::types::{AppState, Request};
use crate::query::Query;
use crate::rollup;
use rusqlite::Connection;
use serde_json::{json, Value};

/// Headline counts plus the today's-attendance widget. The attendance
/// branch is isolated: if it fails, that one widget degrades to a zero
/// summary instead of taking the whole dashboard down.
fn get_stats(conn: &Connection, _params: &Value) -> Result<Value, OpError> {
    let total_students = Query::table("students").count(conn)?;
    let total_batches = Query::table("batches").count(conn)?;
    let total_academies = Query::table("academies").count(conn)?;

    let today_attendance = Query::table("attendance")
        .select(&["status"])
        .eq("date", today())
        .fetch(conn)
        .map(|rows| {
            rollup::attendance_summary(
                rows.iter()
                    .filter_map(|row| row.get("status").and_then(|v| v.as_str())),
            )
        })
        .unwrap_or(rollup::AttendanceSummary {
            present: 0,
            total: 0,
            percentage: 0.0,
        });

    Ok(json!({
        "totalStudents": total_students,
        "totalBatches": total_batches,
        "totalAcademies": total_academies,
        "todayAttendance": today_attendance,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "dashboard.getStats" => Some(respond(state, req, get_stats)),
        _ => None,
    }
}
