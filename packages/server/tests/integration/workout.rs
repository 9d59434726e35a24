use serde_json::json;

use crate::common::{TestApp, routes};

const PDF_BYTES: &[u8] = b"%PDF-1.4 certificate of completion";

mod creation {
    use super::*;

    #[tokio::test]
    async fn create_then_get_round_trip() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("alice@example.com", "Alice")
            .await;

        let res = app
            .post_workout(
                &[("title", "Morning 5k"), ("points", "25")],
                Some(("finisher.pdf", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "create failed: {}", res.text);
        assert_eq!(res.body["title"], "Morning 5k");
        assert_eq!(res.body["points"], 25.0);
        assert!(res.body["id"].is_string());
        assert!(res.body["created_at"].is_string());
        assert!(res.body["updated_at"].is_string());
        assert_eq!(res.body["certificate"]["content_type"], "application/pdf");
        assert_eq!(res.body["certificate"]["filename"], "finisher.pdf");
        assert_eq!(res.body["certificate"]["storage"], "referenced");

        let id = res.id();
        let fetched = app.get_with_token(&routes::workout(&id), &token).await;
        assert_eq!(fetched.status, 200);
        assert_eq!(fetched.body["title"], "Morning 5k");
        assert_eq!(fetched.body["points"], 25.0);
        assert_eq!(fetched.body["id"], id);
    }

    #[tokio::test]
    async fn missing_title_and_points_listed_together() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("bob@example.com", "Bob")
            .await;

        let res = app.post_workout(&[], None, &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["empty_fields"], json!(["title", "points"]));
    }

    #[tokio::test]
    async fn missing_points_listed_alone() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("carol@example.com", "Carol")
            .await;

        let res = app
            .post_workout(&[("title", "Deadlifts")], None, &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["empty_fields"], json!(["points"]));
    }

    #[tokio::test]
    async fn non_numeric_points_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("dave@example.com", "Dave")
            .await;

        let res = app
            .post_workout(&[("title", "Rowing"), ("points", "ten")], None, &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn negative_and_fractional_points_accepted() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("erin@example.com", "Erin")
            .await;

        let res = app
            .post_workout(&[("title", "Penalty"), ("points", "-3.5")], None, &token)
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["points"], -3.5);
    }

    #[tokio::test]
    async fn certificate_required_mode_reports_missing_certificate() {
        let app = TestApp::spawn_with(|c| c.certificate.required = true).await;
        let token = app
            .create_authenticated_user("frank@example.com", "Frank")
            .await;

        let res = app
            .post_workout(&[("title", "Marathon"), ("points", "100")], None, &token)
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["empty_fields"], json!(["certificate"]));
    }
}

mod attachment_validation {
    use super::*;

    #[tokio::test]
    async fn rejects_disallowed_extension_regardless_of_mime() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("mallory@example.com", "Mallory")
            .await;

        // Declared MIME type says PDF, filename says executable.
        let res = app
            .post_workout(
                &[("title", "Sneaky"), ("points", "5")],
                Some(("cert.exe", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ATTACHMENT_FORMAT");
    }

    #[tokio::test]
    async fn rejects_disallowed_extension_on_update() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("oscar@example.com", "Oscar")
            .await;
        let id = app.create_workout(&token, "Squats", "10").await;

        let res = app
            .patch_workout(
                &id,
                &[],
                Some(("notes.txt", b"notes".to_vec(), "text/plain")),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "INVALID_ATTACHMENT_FORMAT");
    }

    #[tokio::test]
    async fn extension_check_is_case_insensitive() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("peggy@example.com", "Peggy")
            .await;

        for (i, filename) in ["CERT.PDF", "photo.JPG", "scan.Jpeg", "badge.PnG"]
            .iter()
            .enumerate()
        {
            let res = app
                .post_workout(
                    &[("title", "Upload test"), ("points", &i.to_string())],
                    Some((filename, PDF_BYTES.to_vec(), "application/octet-stream")),
                    &token,
                )
                .await;
            assert_eq!(res.status, 201, "{filename} should be accepted: {}", res.text);
        }
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn get_is_idempotent() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("quinn@example.com", "Quinn")
            .await;
        let id = app.create_workout(&token, "Bench press", "15").await;

        let first = app.get_with_token(&routes::workout(&id), &token).await;
        let second = app.get_with_token(&routes::workout(&id), &token).await;
        assert_eq!(first.status, 200);
        assert_eq!(first.text, second.text);
    }

    #[tokio::test]
    async fn malformed_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("rita@example.com", "Rita")
            .await;

        let res = app
            .get_with_token(&routes::workout("not-a-uuid"), &token)
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("sam@example.com", "Sam")
            .await;

        let res = app
            .get_with_token(
                &routes::workout("01936f0e-1234-7abc-8000-000000000001"),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_owner_enriched() {
        let app = TestApp::spawn().await;
        let alice = app
            .create_authenticated_user("alice@example.com", "Alice")
            .await;
        let bob = app.create_authenticated_user("bob@example.com", "Bob").await;

        app.create_workout(&alice, "First", "1").await;
        app.create_workout(&bob, "Second", "2").await;
        app.create_workout(&alice, "Third", "3").await;

        // Listing is not owner-scoped: Bob sees everyone's workouts.
        let res = app.get_with_token(routes::WORKOUTS, &bob).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 3);

        let workouts = res.body["workouts"].as_array().unwrap();
        let titles: Vec<&str> = workouts
            .iter()
            .map(|w| w["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);

        assert_eq!(workouts[0]["owner"]["email"], "alice@example.com");
        assert_eq!(workouts[0]["owner"]["name"], "Alice");
        assert_eq!(workouts[1]["owner"]["email"], "bob@example.com");
    }
}

mod updates {
    use super::*;

    #[tokio::test]
    async fn partial_update_changes_only_points() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("trudy@example.com", "Trudy")
            .await;

        let created = app
            .post_workout(
                &[("title", "Intervals"), ("points", "40")],
                Some(("splits.png", b"PNG".to_vec(), "image/png")),
                &token,
            )
            .await;
        assert_eq!(created.status, 201);
        let id = created.id();
        let created_updated_at = created.body["updated_at"].as_str().unwrap().to_string();

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let res = app
            .patch_workout(&id, &[("points", "99")], None, &token)
            .await;
        assert_eq!(res.status, 200, "update failed: {}", res.text);
        assert_eq!(res.body["points"], 99.0);
        assert_eq!(res.body["title"], "Intervals");
        assert_eq!(res.body["certificate"]["filename"], "splits.png");
        assert_ne!(res.body["updated_at"].as_str().unwrap(), created_updated_at);
        assert_eq!(
            res.body["created_at"].as_str().unwrap(),
            created.body["created_at"].as_str().unwrap()
        );
    }

    #[tokio::test]
    async fn immutable_fields_are_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("uma@example.com", "Uma")
            .await;
        let id = app.create_workout(&token, "Yoga", "5").await;

        for field in ["owner_id", "id", "created_at", "user_id"] {
            let res = app
                .patch_workout(&id, &[(field, "1")], None, &token)
                .await;
            assert_eq!(res.status, 400, "{field} should be rejected");
            assert_eq!(res.body["code"], "VALIDATION_ERROR");
        }
    }

    #[tokio::test]
    async fn empty_update_returns_record_unchanged() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("vera@example.com", "Vera")
            .await;
        let id = app.create_workout(&token, "Stretching", "2").await;

        let before = app.get_with_token(&routes::workout(&id), &token).await;
        let res = app.patch_workout(&id, &[], None, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, before.text);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("walt@example.com", "Walt")
            .await;

        let res = app
            .patch_workout(
                "01936f0e-1234-7abc-8000-000000000001",
                &[("points", "1")],
                None,
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod ownership {
    use super::*;

    #[tokio::test]
    async fn non_owner_cannot_update() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "Owner")
            .await;
        let intruder = app
            .create_authenticated_user("intruder@example.com", "Intruder")
            .await;
        let id = app.create_workout(&owner, "Private session", "10").await;

        let res = app
            .patch_workout(&id, &[("points", "9000")], None, &intruder)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");

        // Unchanged for the owner.
        let fetched = app.get_with_token(&routes::workout(&id), &owner).await;
        assert_eq!(fetched.body["points"], 10.0);
    }

    #[tokio::test]
    async fn non_owner_cannot_delete() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "Owner")
            .await;
        let intruder = app
            .create_authenticated_user("intruder@example.com", "Intruder")
            .await;
        let id = app.create_workout(&owner, "Keep out", "10").await;

        let res = app.delete_with_token(&routes::workout(&id), &intruder).await;
        assert_eq!(res.status, 403);

        let fetched = app.get_with_token(&routes::workout(&id), &owner).await;
        assert_eq!(fetched.status, 200);
    }

    #[tokio::test]
    async fn admin_role_does_not_bypass_mutation_ownership() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("owner@example.com", "Owner")
            .await;
        let admin = app.create_admin("admin@example.com", "Admin").await;
        let id = app.create_workout(&owner, "Member workout", "10").await;

        let res = app.delete_with_token(&routes::workout(&id), &admin).await;
        assert_eq!(res.status, 403);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_removes_from_listing() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("xena@example.com", "Xena")
            .await;
        let keep = app.create_workout(&token, "Keep", "1").await;
        let remove = app.create_workout(&token, "Remove", "2").await;

        let res = app.delete_with_token(&routes::workout(&remove), &token).await;
        assert_eq!(res.status, 204);

        let list = app.get_with_token(routes::WORKOUTS, &token).await;
        assert_eq!(list.body["total"], 1);
        let ids: Vec<&str> = list.body["workouts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![keep.as_str()]);

        let gone = app.get_with_token(&routes::workout(&remove), &token).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("yuri@example.com", "Yuri")
            .await;

        let res = app
            .delete_with_token(
                &routes::workout("01936f0e-1234-7abc-8000-000000000001"),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod certificate_lifecycle {
    use super::*;

    #[tokio::test]
    async fn referenced_certificate_download_round_trip() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("zara@example.com", "Zara")
            .await;

        let created = app
            .post_workout(
                &[("title", "Race"), ("points", "50")],
                Some(("result.pdf", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(created.status, 201);

        let (status, content_type, bytes) = app
            .get_raw(&routes::certificate(&created.id()), &token)
            .await;
        assert_eq!(status, 200);
        assert_eq!(content_type.as_deref(), Some("application/pdf"));
        assert_eq!(bytes, PDF_BYTES);
    }

    #[tokio::test]
    async fn embedded_mode_round_trip() {
        let app = TestApp::spawn_with(|c| {
            c.certificate.mode = server::config::StorageMode::Embedded;
        })
        .await;
        let token = app
            .create_authenticated_user("ada@example.com", "Ada")
            .await;

        let created = app
            .post_workout(
                &[("title", "Climb"), ("points", "30")],
                Some(("summit.jpg", b"JPEG_DATA".to_vec(), "image/jpeg")),
                &token,
            )
            .await;
        assert_eq!(created.status, 201);
        assert_eq!(created.body["certificate"]["storage"], "embedded");

        // Nothing lands in the byte store in embedded mode.
        assert_eq!(app.stored_certificate_count(), 0);

        let (status, content_type, bytes) = app
            .get_raw(&routes::certificate(&created.id()), &token)
            .await;
        assert_eq!(status, 200);
        assert_eq!(content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(bytes, b"JPEG_DATA");
    }

    #[tokio::test]
    async fn workout_without_certificate_has_no_download() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("ben@example.com", "Ben")
            .await;
        let id = app.create_workout(&token, "No cert", "1").await;

        let res = app.get_with_token(&routes::certificate(&id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_releases_referenced_payload() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("cid@example.com", "Cid")
            .await;

        let created = app
            .post_workout(
                &[("title", "Solo"), ("points", "10")],
                Some(("only.pdf", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(created.status, 201);
        assert_eq!(app.stored_certificate_count(), 1);

        let res = app
            .delete_with_token(&routes::workout(&created.id()), &token)
            .await;
        assert_eq!(res.status, 204);
        assert_eq!(app.stored_certificate_count(), 0);
    }

    #[tokio::test]
    async fn shared_payload_survives_until_last_reference_deleted() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("dot@example.com", "Dot")
            .await;

        let first = app
            .post_workout(
                &[("title", "One"), ("points", "1")],
                Some(("same.pdf", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        let second = app
            .post_workout(
                &[("title", "Two"), ("points", "2")],
                Some(("same.pdf", PDF_BYTES.to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(first.status, 201);
        assert_eq!(second.status, 201);
        // Content-addressed: identical bytes stored once.
        assert_eq!(app.stored_certificate_count(), 1);

        app.delete_with_token(&routes::workout(&first.id()), &token)
            .await;
        assert_eq!(app.stored_certificate_count(), 1);

        app.delete_with_token(&routes::workout(&second.id()), &token)
            .await;
        assert_eq!(app.stored_certificate_count(), 0);
    }

    #[tokio::test]
    async fn replacing_certificate_releases_previous_payload() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("eve@example.com", "Eve")
            .await;

        let created = app
            .post_workout(
                &[("title", "Versioned"), ("points", "5")],
                Some(("v1.pdf", b"version one".to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(created.status, 201);
        let id = created.id();
        assert_eq!(app.stored_certificate_count(), 1);

        let updated = app
            .patch_workout(
                &id,
                &[],
                Some(("v2.pdf", b"version two".to_vec(), "application/pdf")),
                &token,
            )
            .await;
        assert_eq!(updated.status, 200, "replace failed: {}", updated.text);
        assert_eq!(updated.body["certificate"]["filename"], "v2.pdf");
        assert_eq!(app.stored_certificate_count(), 1);

        let (status, _, bytes) = app.get_raw(&routes::certificate(&id), &token).await;
        assert_eq!(status, 200);
        assert_eq!(bytes, b"version two");
    }
}
