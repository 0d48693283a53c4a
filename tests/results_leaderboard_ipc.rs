
use serde_json::json;
use test_support::*;

fn record_result(
    state: &mut academyd::api::AppState,
    student: &str,
    batch: &str,
    marks: f64,
    total: f64,
) {
    request_ok(
        state,
        "result",
        "results.create",
        json!({ "input": {
            "studentId": student,
            "batchId": batch,
            "subject": "Maths",
            "testName": "Unit Test",
            "marks": marks,
            "totalMarks": total,
            "testDate": "2024-06-10",
        }}),
    );
}

#[test]
fn leaderboard_ranks_by_summed_marks_not_averaged_percentages() {
    let (mut state, _ws) = open_state("leaderboard");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");
    let asha = create_student(&mut state, "Asha", vec![batch.as_str()]);
    let bina = create_student(&mut state, "Bina", vec![batch.as_str()]);

    record_result(&mut state, &asha, &batch, 8.0, 10.0);
    record_result(&mut state, &asha, &batch, 18.0, 20.0);
    record_result(&mut state, &bina, &batch, 9.0, 10.0);

    let board = request_ok(
        &mut state,
        "board",
        "results.getLeaderboard",
        json!({ "batchId": batch }),
    );
    let board = board.as_array().expect("board");
    assert_eq!(board.len(), 2);

    // Bina's single 9/10 (90%) beats Asha's 26/30 (86.7%).
    assert_eq!(board[0]["studentName"], json!("Bina"));
    assert_eq!(board[0]["testCount"], json!(1));
    assert!((board[0]["percentage"].as_f64().unwrap() - 90.0).abs() < 1e-9);

    assert_eq!(board[1]["studentName"], json!("Asha"));
    assert_eq!(board[1]["testCount"], json!(2));
    assert_eq!(board[1]["_id"], json!(asha));
    assert_eq!(board[1]["studentId"], json!(asha));
}

#[test]
fn leaderboard_names_deleted_students_unknown() {
    let (mut state, _ws) = open_state("leaderboard-unknown");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");
    let leaver = create_student(&mut state, "Leaver", vec![batch.as_str()]);

    record_result(&mut state, &leaver, &batch, 5.0, 10.0);
    request_ok(&mut state, "rm", "students.delete", json!({ "id": leaver }));

    let board = request_ok(
        &mut state,
        "board",
        "results.getLeaderboard",
        json!({ "batchId": batch }),
    );
    assert_eq!(board[0]["studentName"], json!("Unknown"));
}

#[test]
fn results_list_joins_names_and_orders_newest_first() {
    let (mut state, _ws) = open_state("results-list");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");
    let asha = create_student(&mut state, "Asha", vec![batch.as_str()]);

    request_ok(
        &mut state,
        "r1",
        "results.create",
        json!({ "input": {
            "studentId": asha, "batchId": batch, "subject": "Maths",
            "marks": 7, "totalMarks": 10, "testDate": "2024-06-01",
        }}),
    );
    request_ok(
        &mut state,
        "r2",
        "results.create",
        json!({ "input": {
            "studentId": asha, "batchId": batch, "subject": "Maths",
            "marks": 8, "totalMarks": 10, "testDate": "2024-06-15",
        }}),
    );

    let listed = request_ok(
        &mut state,
        "list",
        "results.list",
        json!({ "studentId": asha }),
    );
    let listed = listed.as_array().expect("rows");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["testDate"], json!("2024-06-15"));
    assert_eq!(listed[0]["studentId"]["name"], json!("Asha"));
}
