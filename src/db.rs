use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("academy.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'teacher',
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS academies(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    // Batches go with their academy; the facade relies on this rather than
    // cascade-cleaning by hand.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS batches(
            id TEXT PRIMARY KEY,
            academy_id TEXT NOT NULL,
            name TEXT NOT NULL,
            schedule TEXT,
            subjects TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(academy_id) REFERENCES academies(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_batches_academy ON batches(academy_id)",
        [],
    )?;

    // batch_ids is a JSON array of batch ids; membership is filtered with
    // json_each, not a join table. A student with an empty list is
    // unassigned, which is valid.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            phone TEXT,
            dob TEXT,
            guardian_name TEXT,
            guardian_phone TEXT,
            address TEXT,
            aadhar_number TEXT,
            batch_ids TEXT NOT NULL DEFAULT '[]',
            photo TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_name ON students(name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT,
            UNIQUE(student_id, batch_id, date)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_batch_date ON attendance(batch_id, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS syllabus(
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            subject TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            sort_order INTEGER NOT NULL DEFAULT 0,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_syllabus_batch ON syllabus(batch_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS test_results(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            batch_id TEXT,
            subject TEXT NOT NULL,
            test_name TEXT,
            marks REAL NOT NULL,
            total_marks REAL NOT NULL,
            test_date TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_test_results_student ON test_results(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_test_results_batch ON test_results(batch_id)",
        [],
    )?;

    // Written once when a student is removed; name and batch ids are
    // snapshots, not live references.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_exits(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            exit_type TEXT NOT NULL,
            reason TEXT,
            batch_ids TEXT NOT NULL DEFAULT '[]',
            exit_date TEXT NOT NULL,
            created_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS announcements(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            priority TEXT NOT NULL DEFAULT 'medium',
            target_batch_ids TEXT NOT NULL DEFAULT '[]',
            viewed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notes(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT,
            batch_id TEXT,
            is_public INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_notes_batch ON notes(batch_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            type TEXT NOT NULL DEFAULT 'document',
            category TEXT,
            description TEXT,
            batch_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            date TEXT NOT NULL,
            end_date TEXT,
            type TEXT NOT NULL DEFAULT 'other',
            batch_id TEXT,
            reminder_time TEXT,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_date ON events(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS todos(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            batch_id TEXT,
            due_date TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    // day_topics maps weekday keys to free text; one plan per batch and week.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS weekly_plans(
            id TEXT PRIMARY KEY,
            batch_id TEXT NOT NULL,
            week_start TEXT NOT NULL,
            day_topics TEXT NOT NULL DEFAULT '{}',
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            UNIQUE(batch_id, week_start)
        )",
        [],
    )?;

    Ok(conn)
}

/// Columns persisted as JSON text, decoded into arrays/objects when rows
/// materialize.
pub fn json_columns(table: &str) -> &'static [&'static str] {
    match table {
        "batches" => &["subjects"],
        "students" => &["batch_ids"],
        "student_exits" => &["batch_ids"],
        "announcements" => &["target_batch_ids"],
        "notes" => &["tags"],
        "weekly_plans" => &["day_topics"],
        _ => &[],
    }
}

/// Integer columns with boolean meaning, decoded to true/false.
pub fn bool_columns(table: &str) -> &'static [&'static str] {
    match table {
        "syllabus" => &["completed"],
        "todos" => &["completed"],
        "weekly_plans" => &["completed"],
        "announcements" => &["viewed"],
        "notes" => &["is_public"],
        _ => &[],
    }
}
