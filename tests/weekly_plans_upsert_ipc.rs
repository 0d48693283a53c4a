
use serde_json::json;
use test_support::*;

fn current_monday() -> String {
    let today = chrono::Local::now().date_naive();
    let monday = today
        - chrono::Duration::days(chrono::Datelike::weekday(&today).num_days_from_monday() as i64);
    monday.to_string()
}

#[test]
fn upsert_creates_then_updates_the_same_plan() {
    let (mut state, _ws) = open_state("plans-upsert");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");

    let created = request_ok(
        &mut state,
        "u1",
        "weeklyPlans.upsert",
        json!({
            "batchId": batch,
            "weekStart": "2024-06-03",
            "input": { "dayTopics": { "monday": "Fractions" } },
        }),
    );
    let plan_id = created["id"].as_str().expect("plan id").to_string();
    assert_eq!(created["dayTopics"]["monday"], json!("Fractions"));

    let updated = request_ok(
        &mut state,
        "u2",
        "weeklyPlans.upsert",
        json!({
            "batchId": batch,
            "weekStart": "2024-06-03",
            "input": { "dayTopics": { "monday": "Fractions", "tuesday": "Decimals" } },
        }),
    );
    assert_eq!(
        updated["id"],
        json!(plan_id),
        "same (batch, week) must update in place"
    );
    assert_eq!(updated["dayTopics"]["tuesday"], json!("Decimals"));

    let listed = request_ok(
        &mut state,
        "list",
        "weeklyPlans.list",
        json!({ "batchId": batch }),
    );
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[test]
fn get_current_finds_this_weeks_plan_or_null() {
    let (mut state, _ws) = open_state("plans-current");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");

    let empty = request_ok(
        &mut state,
        "g1",
        "weeklyPlans.getCurrent",
        json!({ "batchId": batch }),
    );
    assert_eq!(empty, json!(null));

    request_ok(
        &mut state,
        "u",
        "weeklyPlans.upsert",
        json!({
            "batchId": batch,
            "weekStart": current_monday(),
            "input": { "dayTopics": { "monday": "Revision" } },
        }),
    );

    let current = request_ok(
        &mut state,
        "g2",
        "weeklyPlans.getCurrent",
        json!({ "batchId": batch }),
    );
    assert_eq!(current["weekStart"], json!(current_monday()));
    assert_eq!(current["completed"], json!(false));
}

#[test]
fn mark_complete_sets_the_flag() {
    let (mut state, _ws) = open_state("plans-complete");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");

    let created = request_ok(
        &mut state,
        "c",
        "weeklyPlans.create",
        json!({ "input": { "batchId": batch, "weekStart": "2024-06-03" } }),
    );
    let id = created["id"].as_str().expect("id").to_string();

    let done = request_ok(
        &mut state,
        "m",
        "weeklyPlans.markComplete",
        json!({ "id": id }),
    );
    assert_eq!(done["completed"], json!(true));
}
