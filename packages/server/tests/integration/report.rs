use crate::common::{TestApp, routes};

#[tokio::test]
async fn groups_by_owner_with_point_totals() {
    let app = TestApp::spawn().await;
    let alice = app
        .create_authenticated_user("alice@example.com", "Alice")
        .await;
    let bob = app.create_authenticated_user("bob@example.com", "Bob").await;
    // Carol registers but never logs a workout.
    app.create_authenticated_user("carol@example.com", "Carol")
        .await;
    let admin = app.create_admin("admin@example.com", "Admin").await;

    app.create_workout(&alice, "Run", "10").await;
    app.create_workout(&alice, "Swim", "20").await;
    app.create_workout(&bob, "Walk", "5").await;

    let res = app.get_with_token(routes::ADMIN_REPORT, &admin).await;
    assert_eq!(res.status, 200, "report failed: {}", res.text);

    let groups = res.body.as_array().expect("report should be an array");
    // Exactly two groups: Carol (zero workouts) and the admin do not appear.
    assert_eq!(groups.len(), 2);

    let alice_group = groups
        .iter()
        .find(|g| g["user"]["email"] == "alice@example.com")
        .expect("Alice's group missing");
    assert_eq!(alice_group["total_points"], 30.0);
    assert_eq!(alice_group["workouts"].as_array().unwrap().len(), 2);
    assert_eq!(alice_group["user"]["name"], "Alice");

    let bob_group = groups
        .iter()
        .find(|g| g["user"]["email"] == "bob@example.com")
        .expect("Bob's group missing");
    assert_eq!(bob_group["total_points"], 5.0);
    assert_eq!(bob_group["workouts"].as_array().unwrap().len(), 1);
    assert_eq!(bob_group["workouts"][0]["title"], "Walk");
    assert_eq!(bob_group["workouts"][0]["points"], 5.0);
}

#[tokio::test]
async fn groups_are_ordered_by_owner_id() {
    let app = TestApp::spawn().await;
    let first = app
        .create_authenticated_user("first@example.com", "First")
        .await;
    let second = app
        .create_authenticated_user("second@example.com", "Second")
        .await;
    let admin = app.create_admin("admin@example.com", "Admin").await;

    // Creation order deliberately reversed relative to registration.
    app.create_workout(&second, "Later owner", "2").await;
    app.create_workout(&first, "Earlier owner", "1").await;

    let res = app.get_with_token(routes::ADMIN_REPORT, &admin).await;
    assert_eq!(res.status, 200);

    let groups = res.body.as_array().unwrap();
    let emails: Vec<&str> = groups
        .iter()
        .map(|g| g["user"]["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["first@example.com", "second@example.com"]);
}

#[tokio::test]
async fn projection_omits_certificate_payloads() {
    let app = TestApp::spawn().await;
    let user = app
        .create_authenticated_user("runner@example.com", "Runner")
        .await;
    let admin = app.create_admin("admin@example.com", "Admin").await;

    let res = app
        .post_workout(
            &[("title", "Certified run"), ("points", "12")],
            Some(("proof.pdf", b"%PDF-1.4 proof".to_vec(), "application/pdf")),
            &user,
        )
        .await;
    assert_eq!(res.status, 201);

    let report = app.get_with_token(routes::ADMIN_REPORT, &admin).await;
    assert_eq!(report.status, 200);

    let workout = &report.body[0]["workouts"][0];
    assert_eq!(workout["title"], "Certified run");
    assert_eq!(workout["points"], 12.0);
    assert!(workout["created_at"].is_string());
    assert!(workout.get("certificate").is_none());
    assert!(workout.get("certificate_data").is_none());
}

#[tokio::test]
async fn empty_collection_yields_empty_report() {
    let app = TestApp::spawn().await;
    let admin = app.create_admin("admin@example.com", "Admin").await;

    let res = app.get_with_token(routes::ADMIN_REPORT, &admin).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn members_cannot_read_the_report() {
    let app = TestApp::spawn().await;
    let member = app
        .create_authenticated_user("member@example.com", "Member")
        .await;

    let res = app.get_with_token(routes::ADMIN_REPORT, &member).await;
    assert_eq!(res.status, 403);
    assert_eq!(res.body["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn report_requires_authentication() {
    let app = TestApp::spawn().await;

    let res = app.get_without_token(routes::ADMIN_REPORT).await;
    assert_eq!(res.status, 401);
}
