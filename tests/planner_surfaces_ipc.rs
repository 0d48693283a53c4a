
use serde_json::json;
use test_support::*;

#[test]
fn deleting_an_academy_cascades_to_its_batches() {
    let (mut state, _ws) = open_state("academy-cascade");
    let academy = create_academy(&mut state, "Doomed");
    create_batch(&mut state, &academy, "Goes Too");

    request_ok(&mut state, "rm", "academies.delete", json!({ "id": academy }));

    let batches = request_ok(
        &mut state,
        "list",
        "batches.list",
        json!({ "academyId": academy }),
    );
    assert_eq!(batches, json!([]));
}

#[test]
fn notes_resolve_their_batch_or_come_back_unattached() {
    let (mut state, _ws) = open_state("notes");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");

    request_ok(
        &mut state,
        "n1",
        "notes.create",
        json!({ "input": { "title": "Attached", "content": "body", "batchId": batch } }),
    );
    // Empty-string optionals collapse to null.
    request_ok(
        &mut state,
        "n2",
        "notes.create",
        json!({ "input": { "title": "Loose", "content": "", "batchId": "", "tags": ["misc"] } }),
    );

    let listed = request_ok(&mut state, "list", "notes.list", json!({}));
    let listed = listed.as_array().expect("notes");
    let by_title = |title: &str| {
        listed
            .iter()
            .find(|n| n["title"].as_str() == Some(title))
            .expect("note")
    };
    assert_eq!(by_title("Attached")["batchId"]["name"], json!("Batch A"));
    assert_eq!(by_title("Loose")["batchId"], json!(null));
    assert_eq!(by_title("Loose")["content"], json!(null));
    assert_eq!(by_title("Loose")["tags"], json!(["misc"]));
    assert_eq!(by_title("Loose")["isPublic"], json!(false));
}

#[test]
fn events_filter_by_date_window() {
    let (mut state, _ws) = open_state("events-window");
    for (title, date) in [
        ("Before", "2024-05-01"),
        ("Inside", "2024-06-15"),
        ("After", "2024-07-20"),
    ] {
        request_ok(
            &mut state,
            "e",
            "events.create",
            json!({ "input": { "title": title, "date": date, "type": "other" } }),
        );
    }

    let june = request_ok(
        &mut state,
        "list",
        "events.list",
        json!({ "startDate": "2024-06-01", "endDate": "2024-06-30" }),
    );
    let titles: Vec<&str> = june
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Inside"]);
}

#[test]
fn todos_toggle_and_filter_by_batch() {
    let (mut state, _ws) = open_state("todos");
    let academy = create_academy(&mut state, "Campus");
    let batch = create_batch(&mut state, &academy, "Batch A");

    let todo = request_ok(
        &mut state,
        "t",
        "todos.create",
        json!({ "input": { "title": "Grade papers", "batchId": batch } }),
    );
    assert_eq!(todo["completed"], json!(false));
    let id = todo["id"].as_str().expect("id").to_string();

    request_ok(
        &mut state,
        "t2",
        "todos.create",
        json!({ "input": { "title": "Other batch", "batchId": "elsewhere" } }),
    );

    let toggled = request_ok(&mut state, "toggle", "todos.toggle", json!({ "id": id }));
    assert_eq!(toggled["completed"], json!(true));

    let mine = request_ok(&mut state, "list", "todos.list", json!({ "batchId": batch }));
    let mine = mine.as_array().expect("todos");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["title"], json!("Grade papers"));
}

#[test]
fn documents_keep_their_type_and_clean_optionals() {
    let (mut state, _ws) = open_state("documents");
    let doc = request_ok(
        &mut state,
        "d",
        "documents.create",
        json!({ "input": {
            "title": "Syllabus PDF",
            "url": "https://example.com/syllabus.pdf",
            "type": "link",
            "category": "",
        }}),
    );
    assert_eq!(doc["type"], json!("link"));
    assert_eq!(doc["category"], json!(null));

    let id = doc["id"].as_str().expect("id").to_string();
    request_ok(&mut state, "rm", "documents.delete", json!({ "id": id }));
    let listed = request_ok(&mut state, "list", "documents.list", json!({}));
    assert_eq!(listed, json!([]));
}
