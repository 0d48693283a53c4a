use serde::Serialize;
use std::collections::HashMap;

/// Syllabus completion roll-up. An empty topic set is a defined zero result,
/// never a division by zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub percentage: i64,
}

pub fn syllabus_progress<I>(completed_flags: I) -> Progress
where
    I: IntoIterator<Item = bool>,
{
    let mut total = 0usize;
    let mut completed = 0usize;
    for flag in completed_flags {
        total += 1;
        if flag {
            completed += 1;
        }
    }
    let percentage = if total > 0 {
        ((completed as f64 / total as f64) * 100.0).round() as i64
    } else {
        0
    };
    Progress {
        total,
        completed,
        percentage,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "studentName")]
    pub student_name: String,
    pub percentage: f64,
    #[serde(rename = "testCount")]
    pub test_count: usize,
}

/// Rank students by summed marks over summed total marks, not by averaging
/// per-test percentages: a 9/10 single test outranks 8/10 + 18/20. Ties keep
/// first-seen order (stable sort over insertion-ordered accumulation).
pub fn leaderboard(
    results: &[(String, f64, f64)],
    names: &HashMap<String, String>,
) -> Vec<LeaderboardEntry> {
    struct Accum {
        marks: f64,
        total: f64,
        tests: usize,
    }
    let mut order: Vec<String> = Vec::new();
    let mut by_student: HashMap<String, Accum> = HashMap::new();
    for (student_id, marks, total_marks) in results {
        let entry = by_student.entry(student_id.clone()).or_insert_with(|| {
            order.push(student_id.clone());
            Accum {
                marks: 0.0,
                total: 0.0,
                tests: 0,
            }
        });
        entry.marks += marks;
        entry.total += total_marks;
        entry.tests += 1;
    }

    let mut out: Vec<LeaderboardEntry> = order
        .into_iter()
        .map(|student_id| {
            let acc = &by_student[&student_id];
            let percentage = if acc.total > 0.0 {
                acc.marks / acc.total * 100.0
            } else {
                0.0
            };
            LeaderboardEntry {
                id: student_id.clone(),
                student_name: names
                    .get(&student_id)
                    .cloned()
                    .unwrap_or_else(|| "Unknown".to_string()),
                student_id,
                percentage,
                test_count: acc.tests,
            }
        })
        .collect();
    out.sort_by(|a, b| {
        b.percentage
            .partial_cmp(&a.percentage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    out
}

/// Today's-attendance widget summary: only "present" counts toward the rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub present: usize,
    pub total: usize,
    pub percentage: f64,
}

pub fn attendance_summary<'a, I>(statuses: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a str>,
{
    let mut present = 0usize;
    let mut total = 0usize;
    for status in statuses {
        total += 1;
        if status == "present" {
            present += 1;
        }
    }
    let percentage = if total > 0 {
        present as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    AttendanceSummary {
        present,
        total,
        percentage,
    }
}

/// Per-student attendance rate for the analytics roll-up: present and late
/// both count as attended; no records at all is None, not 0%.
pub fn attendance_percent<'a, I>(statuses: I) -> Option<i64>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut attended = 0usize;
    let mut total = 0usize;
    for status in statuses {
        total += 1;
        if status == "present" || status == "late" {
            attended += 1;
        }
    }
    if total == 0 {
        return None;
    }
    Some(((attended as f64 / total as f64) * 100.0).round() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExitStats {
    pub total: usize,
    pub kicked: usize,
    pub left: usize,
}

pub fn exit_stats<'a, I>(exit_types: I) -> ExitStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut total = 0usize;
    let mut kicked = 0usize;
    let mut left = 0usize;
    for t in exit_types {
        total += 1;
        match t {
            "kicked" => kicked += 1,
            "left" => left += 1,
            _ => {}
        }
    }
    ExitStats {
        total,
        kicked,
        left,
    }
}
