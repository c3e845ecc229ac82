mod common;

use common::{create_issue, fresh_fingerprint, report, submit_as};

#[tokio::test]
async fn test_nearby_similar_report_is_linked_as_duplicate() {
    let app = common::spawn_app().await;

    let first = create_issue(
        &app,
        "Pothole on Main St",
        "Deep pothole near the crosswalk",
        "Pothole",
        40.0,
        -75.0,
    )
    .await;

    let (status, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "pothole on main street",
            "Deep pothole near the crosswalk",
            "Pothole",
            40.0003,
            -75.0003,
        ),
    )
    .await;

    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["outcome"], "duplicate");
    assert_eq!(data["duplicate_of"].as_i64().unwrap() as i32, first);
    assert!(data["similarity"].as_f64().unwrap() >= 0.6);

    let dup_id = data["issue_id"].as_i64().unwrap() as i32;
    let dup = common::get_issue(&app, dup_id).await;
    assert_eq!(dup["duplicate_of"].as_i64().unwrap() as i32, first);

    let canonical = common::get_issue(&app, first).await;
    assert_eq!(canonical["duplicate_count"], 1);
    // One duplicate adds the duplicate weight on top of the Pothole baseline.
    assert!(canonical["priority_score"].as_f64().unwrap() >= 7.0 + 3.0);
}

#[tokio::test]
async fn test_same_text_far_away_is_a_new_issue() {
    let app = common::spawn_app().await;

    create_issue(
        &app,
        "Pothole on Main St",
        "Deep pothole near the crosswalk",
        "Pothole",
        40.0,
        -75.0,
    )
    .await;

    // Roughly 1.1 km north.
    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "Pothole on Main St",
            "Deep pothole near the crosswalk",
            "Pothole",
            40.01,
            -75.0,
        ),
    )
    .await;

    assert_eq!(body["data"]["outcome"], "created");
    assert!(body["data"]["issue"]["duplicate_of"].is_null());
}

#[tokio::test]
async fn test_unrelated_text_nearby_is_a_new_issue() {
    let app = common::spawn_app().await;

    create_issue(
        &app,
        "Pothole on Main St",
        "Deep pothole near the crosswalk",
        "Pothole",
        40.0,
        -75.0,
    )
    .await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "Graffiti on library wall",
            "Spray paint covering the mural by the entrance",
            "Graffiti",
            40.0002,
            -75.0002,
        ),
    )
    .await;

    assert_eq!(body["data"]["outcome"], "created");
}

#[tokio::test]
async fn test_new_issue_gets_initial_score() {
    let app = common::spawn_app().await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "Hydrant leaking",
            "Water has been running down Elm Street all morning",
            "Water Leak",
            41.0,
            -73.0,
        ),
    )
    .await;

    let issue = &body["data"]["issue"];
    assert_eq!(issue["status"], "new");
    assert_eq!(issue["upvotes_count"], 0);
    assert_eq!(issue["is_spam"], false);
    let score = issue["priority_score"].as_f64().unwrap();
    assert!((score - 9.0).abs() < 0.01, "score was {}", score);
    assert!(issue.get("submitter_fingerprint").is_none());
}

#[tokio::test]
async fn test_short_description_is_rejected_as_spam() {
    let app = common::spawn_app().await;

    let (status, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("Streetlight out", "dark", "Broken Streetlight", 40.0, -75.0),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["data"]["outcome"], "rejected");
    assert_eq!(body["data"]["reason"], "description_too_short");

    // Stored for review, but hidden from the public feed.
    let id = body["data"]["issue_id"].as_i64().unwrap() as i32;
    let stored = common::get_issue(&app, id).await;
    assert_eq!(stored["is_spam"], true);
}

#[tokio::test]
async fn test_repetitive_noise_is_rejected() {
    let app = common::spawn_app().await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("aaaaaaa", "aaaaaaaaaaaaaaaaaaaa", "Other", 40.0, -75.0),
    )
    .await;

    assert_eq!(body["data"]["outcome"], "rejected");
    assert_eq!(body["data"]["reason"], "repetitive_content");
}

#[tokio::test]
async fn test_punctuation_only_description_is_empty() {
    let app = common::spawn_app().await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("Broken bench", "!!!! ???? ....", "Damaged Public Property", 40.0, -75.0),
    )
    .await;

    assert_eq!(body["data"]["outcome"], "rejected");
    assert_eq!(body["data"]["reason"], "empty_description");
}

#[tokio::test]
async fn test_rapid_submissions_are_rate_limited() {
    let app = common::spawn_app().await;
    let device = fresh_fingerprint();

    let places = [
        ("Pothole on Oak Ave", "Large pothole by the bus stop", "Pothole"),
        ("Graffiti on bridge", "Tags painted across the railing", "Graffiti"),
        ("Trash bin overflowing", "Bin at the park entrance is full", "Overflowing Trash Bin"),
        ("Cracked sidewalk", "Slab lifted by tree roots near school", "Sidewalk Damage"),
        ("Signal stuck on red", "Light at 5th and Pine never changes", "Traffic Signal Issue"),
    ];
    for (i, (title, desc, category)) in places.iter().enumerate() {
        let lat = 40.0 + i as f64 * 0.05;
        let (_, body) = submit_as(&app, &device, &report(title, desc, category, lat, -75.0)).await;
        assert_eq!(body["data"]["outcome"], "created", "submission {} failed", i);
    }

    let (_, body) = submit_as(
        &app,
        &device,
        &report(
            "Fallen tree branch",
            "Branch blocking half of the cycle lane",
            "Other",
            41.0,
            -75.0,
        ),
    )
    .await;
    assert_eq!(body["data"]["outcome"], "rejected");
    assert_eq!(body["data"]["reason"], "rate_limited");

    // Other submitters are unaffected.
    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "Fallen tree branch",
            "Branch blocking half of the cycle lane",
            "Other",
            41.0,
            -75.0,
        ),
    )
    .await;
    assert_eq!(body["data"]["outcome"], "created");
}

#[tokio::test]
async fn test_spam_issue_is_never_a_duplicate_target() {
    let app = common::spawn_app().await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("Water leak", "leak", "Water Leak", 40.0, -75.0),
    )
    .await;
    assert_eq!(body["data"]["outcome"], "rejected");

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "Water leak",
            "leak from the main under the road",
            "Water Leak",
            40.0,
            -75.0,
        ),
    )
    .await;
    assert_eq!(body["data"]["outcome"], "created");
}

#[tokio::test]
async fn test_invalid_coordinates_are_rejected() {
    let app = common::spawn_app().await;

    let (status, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("Pothole", "Deep pothole on the corner", "Pothole", 95.0, -75.0),
    )
    .await;

    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_missing_title_is_rejected() {
    let app = common::spawn_app().await;

    let (status, _) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report("", "Deep pothole on the corner", "Pothole", 40.0, -75.0),
    )
    .await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_markup_is_stripped_from_reports() {
    let app = common::spawn_app().await;

    let (_, body) = submit_as(
        &app,
        &fresh_fingerprint(),
        &report(
            "<b>Broken</b> streetlight",
            "<script>alert(1)</script>Lamp post 12 has been dark for a week",
            "Broken Streetlight",
            40.0,
            -75.0,
        ),
    )
    .await;

    let issue = &body["data"]["issue"];
    assert_eq!(issue["title"], "Broken streetlight");
    assert!(!issue["description"].as_str().unwrap().contains("<script>"));
}
