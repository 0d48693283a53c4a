use crate::api::helpers::{date_only, opt_str, respond, today, wrap_row, OpError};
use crate::api::types::{AppState, Request};
use crate::query::Query;
use crate::rollup;
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

const CSV_HEADERS: [&str; 9] = [
    "Name",
    "Email",
    "Phone",
    "DOB",
    "Guardian",
    "Guardian Phone",
    "Address",
    "Attendance %",
    "Total Classes",
];

/// Every field is wrapped in quotes; embedded quotes are NOT doubled, a
/// known gap kept for parity with the dashboard's historical exports.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value)
}

struct StudentRollup {
    row: Map<String, Value>,
    attendance_percent: Option<i64>,
    total_records: usize,
}

fn load_rollups(conn: &Connection, params: &Value) -> Result<Vec<StudentRollup>, OpError> {
    let mut q = Query::table("students").order("name", true);
    if let Some(search) = opt_str(params, "search") {
        q = q.or_ilike(&["name", "email"], &search);
    }
    if let Some(batch_id) = opt_str(params, "batchId") {
        q = q.contains("batch_ids", batch_id);
    }
    let students = q.fetch(conn)?;

    let mut statuses_by_student: HashMap<String, Vec<String>> = HashMap::new();
    for row in Query::table("attendance")
        .select(&["student_id", "status"])
        .fetch(conn)?
    {
        if let (Some(student_id), Some(status)) = (
            row.get("student_id").and_then(|v| v.as_str()),
            row.get("status").and_then(|v| v.as_str()),
        ) {
            statuses_by_student
                .entry(student_id.to_string())
                .or_default()
                .push(status.to_string());
        }
    }

    Ok(students
        .into_iter()
        .map(|row| {
            let statuses = row
                .get("id")
                .and_then(|v| v.as_str())
                .and_then(|id| statuses_by_student.get(id))
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            StudentRollup {
                attendance_percent: rollup::attendance_percent(
                    statuses.iter().map(|s| s.as_str()),
                ),
                total_records: statuses.len(),
                row,
            }
        })
        .collect())
}

/// Per-student attendance roll-up for the analytics screen, with headline
/// buckets: high is 80%+, low is under 60%, and students with no records at
/// all are counted separately rather than as 0%.
fn analytics_students(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let rollups = load_rollups(conn, params)?;

    let total = rollups.len();
    let high = rollups
        .iter()
        .filter(|r| r.attendance_percent.map(|p| p >= 80).unwrap_or(false))
        .count();
    let low = rollups
        .iter()
        .filter(|r| r.attendance_percent.map(|p| p < 60).unwrap_or(false))
        .count();
    let none = rollups
        .iter()
        .filter(|r| r.attendance_percent.is_none())
        .count();

    let students: Vec<Value> = rollups
        .into_iter()
        .map(|r| {
            let mut out = wrap_row(r.row);
            out["attendancePercent"] = r
                .attendance_percent
                .map(Value::from)
                .unwrap_or(Value::Null);
            out["totalRecords"] = Value::from(r.total_records);
            out
        })
        .collect();

    Ok(json!({
        "students": students,
        "stats": {
            "total": total,
            "highAttendance": high,
            "lowAttendance": low,
            "noAttendance": none,
        }
    }))
}

fn text_field(row: &Map<String, Value>, col: &str) -> String {
    row.get(col)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn students_csv(conn: &Connection, params: &Value) -> Result<Value, OpError> {
    let rollups = load_rollups(conn, params)?;

    let mut csv = CSV_HEADERS.join(",");
    csv.push('\n');
    for r in &rollups {
        let attendance = match r.attendance_percent {
            Some(p) => format!("{}%", p),
            None => "N/A".to_string(),
        };
        let fields = [
            text_field(&r.row, "name"),
            text_field(&r.row, "email"),
            text_field(&r.row, "phone"),
            date_only(&text_field(&r.row, "dob")),
            text_field(&r.row, "guardian_name"),
            text_field(&r.row, "guardian_phone"),
            text_field(&r.row, "address"),
            attendance,
            r.total_records.to_string(),
        ];
        let line = fields
            .iter()
            .map(|f| csv_field(f))
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }

    Ok(json!({
        "csv": csv,
        "count": rollups.len(),
        "filename": format!("students_analytics_{}.csv", today()),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "analytics.students" => Some(respond(state, req, analytics_students)),
        "exports.studentsCsv" => Some(respond(state, req, students_csv)),
        _ => None,
    }
}
