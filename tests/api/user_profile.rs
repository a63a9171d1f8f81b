use crate::helpers::TestApp;

#[actix_web::test]
async fn profile_requires_login(){
    let app = TestApp::spawn_app().await;

    let response = reqwest::get(format!("{}/user/profile", app.get_app_url())).await.unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[actix_web::test]
async fn get_profile_returns_user_and_defaults(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user().await;

    let response = app.get_with_token("/user/profile", &user.token).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], user.username.as_str());
    assert!(body["user"].get("password").is_none());
    assert_eq!(body["profile"]["is_vegan"], false);
}

#[actix_web::test]
async fn vegan_preference_implies_vegetarian(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user().await;

    let response = app.post_with_token("/user/profile", &user.token, &serde_json::json!({
        "bio": "Couscous every friday",
        "is_vegan": true,
        "is_vegetarian": false
    })).await;
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = app.get_with_token("/user/profile", &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["profile"]["bio"], "Couscous every friday");
    assert_eq!(body["profile"]["is_vegan"], true);
    assert_eq!(body["profile"]["is_vegetarian"], true);
}

#[actix_web::test]
async fn profile_rejects_invalid_email(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user().await;

    let response = app.post_with_token("/user/profile", &user.token, &serde_json::json!({
        "email": "nowhere"
    })).await;

    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn profile_rejects_email_of_another_user(){
    let app = TestApp::spawn_app().await;
    let first = app.create_user().await;
    let second = app.create_user().await;

    let response = app.post_with_token("/user/profile", &second.token, &serde_json::json!({
        "email": format!("{}@foodflex.ma", first.username)
    })).await;

    assert_eq!(response.status().as_u16(), 400);
}
