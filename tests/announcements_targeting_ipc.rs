
use serde_json::json;
use test_support::*;

#[test]
fn broadcasts_reach_every_batch_and_targets_stay_scoped() {
    let (mut state, _ws) = open_state("announcements-targeting");
    let academy = create_academy(&mut state, "Campus");
    let b1 = create_batch(&mut state, &academy, "Batch One");
    let b2 = create_batch(&mut state, &academy, "Batch Two");

    request_ok(
        &mut state,
        "a1",
        "announcements.create",
        json!({ "input": {
            "title": "Holiday notice",
            "message": "Closed Friday",
            "targetBatchIds": [],
        }}),
    );
    request_ok(
        &mut state,
        "a2",
        "announcements.create",
        json!({ "input": {
            "title": "Batch One only",
            "message": "Extra class",
            "targetBatchIds": [b1],
        }}),
    );

    let for_b1 = request_ok(
        &mut state,
        "list",
        "announcements.list",
        json!({ "batchId": b1 }),
    );
    let titles: Vec<&str> = for_b1
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["title"].as_str())
        .collect();
    assert!(titles.contains(&"Holiday notice"));
    assert!(titles.contains(&"Batch One only"));

    // The other batch sees only the broadcast.
    let for_b2 = request_ok(
        &mut state,
        "list",
        "announcements.list",
        json!({ "batchId": b2 }),
    );
    let titles: Vec<&str> = for_b2
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Holiday notice"]);

    // Targets come back resolved to {id, name} pairs.
    let targeted = for_b1
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["title"] == json!("Batch One only"))
        .expect("targeted row");
    assert_eq!(targeted["targetBatchIds"][0]["id"], json!(b1));
    assert_eq!(targeted["targetBatchIds"][0]["name"], json!("Batch One"));
}

#[test]
fn toggle_viewed_flips_and_flips_back() {
    let (mut state, _ws) = open_state("announcements-toggle");
    let created = request_ok(
        &mut state,
        "a",
        "announcements.create",
        json!({ "input": { "title": "T", "message": "M" } }),
    );
    assert_eq!(created["viewed"], json!(false));
    let id = created["id"].as_str().expect("id").to_string();

    let once = request_ok(
        &mut state,
        "t1",
        "announcements.toggleViewed",
        json!({ "id": id }),
    );
    assert_eq!(once["viewed"], json!(true));

    let twice = request_ok(
        &mut state,
        "t2",
        "announcements.toggleViewed",
        json!({ "id": id }),
    );
    assert_eq!(twice["viewed"], json!(false));
}
