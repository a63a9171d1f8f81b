use fake::{faker::internet::en::SafeEmail, Fake};

use crate::helpers::{TestApp, TEST_PASSWORD};

#[actix_web::test]
async fn signup_then_login_returns_customer_token(){
    let app = TestApp::spawn_app().await;

    let user_id = app.signup("youssef").await;
    let login = app.login("youssef").await;

    assert_eq!(login.user_id, user_id);
    assert_eq!(login.account_kind, "customer");
    assert!(!login.token.is_empty());
}

#[actix_web::test]
async fn login_accepts_email_instead_of_username(){
    let app = TestApp::spawn_app().await;
    app.signup("salma").await;

    let response = app.post_login("salma@foodflex.ma", TEST_PASSWORD).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[actix_web::test]
async fn signup_rejects_taken_username(){
    let app = TestApp::spawn_app().await;
    app.signup("karim").await;

    let email: String = SafeEmail().fake();
    let response = app.post_signup(&serde_json::json!({
        "username": "karim",
        "email": email,
        "password": TEST_PASSWORD,
        "confirm_password": TEST_PASSWORD
    })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["username"].is_string());
}

#[actix_web::test]
async fn signup_reports_every_invalid_field(){
    let app = TestApp::spawn_app().await;

    let response = app.post_signup(&serde_json::json!({
        "username": "",
        "email": "not-an-email",
        "password": "short",
        "confirm_password": "different"
    })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    for field in ["username", "email", "password", "confirm_password"] {
        assert!(body["errors"][field].is_string(), "missing error for {}", field);
    }
}

#[actix_web::test]
async fn login_with_wrong_password_is_unauthorized(){
    let app = TestApp::spawn_app().await;
    app.signup("nadia").await;

    let response = app.post_login("nadia", "definitely-wrong").await;

    assert_eq!(response.status().as_u16(), 401);
}

#[actix_web::test]
async fn session_cookie_authenticates_until_logout(){
    let app = TestApp::spawn_app().await;
    app.signup("omar").await;
    app.login("omar").await;

    let profile_url = format!("{}/user/profile", app.get_app_url());
    let response = app.api_client.get(&profile_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app.api_client.post(format!("{}/logout", app.get_app_url()))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let response = app.api_client.get(&profile_url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[actix_web::test]
async fn invalid_bearer_token_is_rejected(){
    let app = TestApp::spawn_app().await;

    let response = app.get_with_token("/user/profile", "not.a.jwt").await;

    assert_eq!(response.status().as_u16(), 401);
}
