
use serde_json::json;
use test_support::*;

#[test]
fn students_list_pages_and_resolves_batch_names() {
    let (mut state, _ws) = open_state("students-paging");
    let academy = create_academy(&mut state, "North Campus");
    let batch = create_batch(&mut state, &academy, "Morning Batch");

    for n in 1..=25 {
        create_student(&mut state, &format!("Student {:02}", n), vec![batch.as_str()]);
    }

    let page2 = request_ok(
        &mut state,
        "list",
        "students.list",
        json!({ "page": 2, "limit": 10 }),
    );
    assert_eq!(page2["count"], json!(25));
    assert_eq!(page2["totalPages"], json!(3));

    let data = page2["data"].as_array().expect("data array");
    assert_eq!(data.len(), 10);
    assert_eq!(data[0]["name"], json!("Student 11"));
    assert_eq!(data[9]["name"], json!("Student 20"));

    // Batch refs come back denormalized as {id, name} pairs.
    let refs = data[0]["batchIds"].as_array().expect("batchIds array");
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0]["id"], json!(batch));
    assert_eq!(refs[0]["name"], json!("Morning Batch"));

    // Wire rows carry the legacy alias alongside id.
    assert_eq!(data[0]["_id"], data[0]["id"]);

    let last_page = request_ok(
        &mut state,
        "list",
        "students.list",
        json!({ "page": 3, "limit": 10 }),
    );
    assert_eq!(last_page["data"].as_array().map(Vec::len), Some(5));
}

#[test]
fn students_list_search_is_case_insensitive() {
    let (mut state, _ws) = open_state("students-search");
    create_student(&mut state, "Aaliyah Khan", vec![]);
    create_student(&mut state, "Bruno Mendes", vec![]);

    let found = request_ok(
        &mut state,
        "search",
        "students.list",
        json!({ "search": "aaliyah" }),
    );
    assert_eq!(found["count"], json!(1));
    assert_eq!(found["data"][0]["name"], json!("Aaliyah Khan"));
}

#[test]
fn students_list_filters_by_batch_membership() {
    let (mut state, _ws) = open_state("students-batch-filter");
    let academy = create_academy(&mut state, "North Campus");
    let b1 = create_batch(&mut state, &academy, "Batch One");
    let b2 = create_batch(&mut state, &academy, "Batch Two");

    create_student(&mut state, "In One", vec![b1.as_str()]);
    create_student(&mut state, "In Both", vec![b1.as_str(), b2.as_str()]);
    create_student(&mut state, "In Two", vec![b2.as_str()]);

    let listed = request_ok(
        &mut state,
        "filter",
        "students.list",
        json!({ "batchId": b1 }),
    );
    assert_eq!(listed["count"], json!(2));
    let names: Vec<&str> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["name"].as_str())
        .collect();
    assert_eq!(names, vec!["In Both", "In One"]);
}

#[test]
fn dangling_batch_reference_resolves_to_unknown() {
    let (mut state, _ws) = open_state("students-dangling-batch");
    create_student(&mut state, "Orphaned", vec!["no-such-batch"]);

    let listed = request_ok(&mut state, "list", "students.list", json!({}));
    let refs = listed["data"][0]["batchIds"].as_array().expect("refs");
    assert_eq!(refs[0]["id"], json!("no-such-batch"));
    assert_eq!(refs[0]["name"], json!("Unknown"));
}
