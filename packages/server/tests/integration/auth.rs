use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn register_login_me_round_trip() {
        let app = TestApp::spawn().await;

        let reg = app
            .post_json(
                routes::REGISTER,
                &json!({
                    "email": "alice@example.com",
                    "name": "Alice Wonder",
                    "password": "password123",
                }),
            )
            .await;
        assert_eq!(reg.status, 201);
        assert_eq!(reg.body["email"], "alice@example.com");
        assert_eq!(reg.body["name"], "Alice Wonder");
        assert!(reg.body["id"].is_number());
        // The password hash never leaves the server.
        assert!(reg.body.get("password").is_none());

        let login = app
            .post_json(
                routes::LOGIN,
                &json!({"email": "alice@example.com", "password": "password123"}),
            )
            .await;
        assert_eq!(login.status, 200);
        assert_eq!(login.body["role"], "member");
        let token = login.body["token"].as_str().unwrap();

        let me = app.get_with_token(routes::ME, token).await;
        assert_eq!(me.status, 200);
        assert_eq!(me.body["email"], "alice@example.com");
        assert_eq!(me.body["name"], "Alice Wonder");
        assert_eq!(me.body["role"], "member");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = TestApp::spawn().await;
        let body = json!({
            "email": "dup@example.com",
            "name": "First",
            "password": "password123",
        });

        let first = app.post_json(routes::REGISTER, &body).await;
        assert_eq!(first.status, 201);

        let second = app.post_json(routes::REGISTER, &body).await;
        assert_eq!(second.status, 409);
        assert_eq!(second.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn rejects_invalid_email_and_short_password() {
        let app = TestApp::spawn().await;

        let bad_email = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "not-an-email", "name": "X", "password": "password123"}),
            )
            .await;
        assert_eq!(bad_email.status, 400);
        assert_eq!(bad_email.body["code"], "VALIDATION_ERROR");

        let short_pw = app
            .post_json(
                routes::REGISTER,
                &json!({"email": "ok@example.com", "name": "X", "password": "short"}),
            )
            .await;
        assert_eq!(short_pw.status, 400);
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("bob@example.com", "Bob").await;

        let res = app
            .post_json(
                routes::LOGIN,
                &json!({"email": "bob@example.com", "password": "wrong-password"}),
            )
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app
            .post_json(
                routes::LOGIN,
                &json!({"email": "ghost@example.com", "password": "password123"}),
            )
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod tokens {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::WORKOUTS).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::WORKOUTS, "not-a-real-token").await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
