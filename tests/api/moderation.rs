use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use foodflex::schema::restaurant_status_history;
use wiremock::{matchers::{method, path}, Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[actix_web::test]
async fn moderation_requires_superuser(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user().await;

    let response = reqwest::get(format!("{}/dashboard/admin/restaurants", app.get_app_url())).await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app.get_with_token("/dashboard/admin/restaurants", &user.token).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[actix_web::test]
async fn status_changes_update_flags_and_history(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_superuser().await;
    let owner = app.create_owner(30).await;

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&app.email_api)
        .await;

    let route = format!("/dashboard/admin/restaurants/{}/update-status", owner.account.account_id);

    let response = app.post_with_token(&route, &admin.token, &serde_json::json!({
        "status": "sanctioned",
        "reason": "Hygiene inspection failed"
    })).await;
    assert_eq!(response.status().as_u16(), 200);
    let account: serde_json::Value = response.json().await.unwrap();
    assert_eq!(account["status"], "sanctioned");
    assert_eq!(account["is_active"], true);
    assert_eq!(account["pending_approval"], false);
    assert_eq!(account["sanction_reason"], "Hygiene inspection failed");

    let response = app.post_with_token(&route, &admin.token, &serde_json::json!({
        "status": "approved"
    })).await;
    assert_eq!(response.status().as_u16(), 200);

    let detail: serde_json::Value = app.get_with_token(
        &format!("/dashboard/admin/restaurants/{}", owner.account.account_id),
        &admin.token
    ).await.json().await.unwrap();
    assert_eq!(detail["restaurant"]["is_open"], true);

    let mut conn = app.pool.get().unwrap();
    let transitions: Vec<(String, String)> = restaurant_status_history::table
        .filter(restaurant_status_history::account_id.eq(owner.account.account_id))
        .order(restaurant_status_history::created_at.asc())
        .select((restaurant_status_history::old_status, restaurant_status_history::new_status))
        .load(&mut conn)
        .unwrap();
    assert_eq!(transitions, vec![
        ("approved".to_string(), "sanctioned".to_string()),
        ("sanctioned".to_string(), "approved".to_string())
    ]);

    actix_web::rt::time::sleep(std::time::Duration::from_millis(300)).await;
}

#[actix_web::test]
async fn banned_owner_loses_restaurant_access_immediately(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let admin = app.create_superuser().await;
    let owner = app.create_owner(30).await;

    let response = app.get_with_token("/restaurant/dashboard", &owner.user.token).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.post_with_token(
        &format!("/dashboard/admin/restaurants/{}/update-status", owner.account.account_id),
        &admin.token,
        &serde_json::json!({ "status": "banned", "reason": "Fraud" })
    ).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get_with_token("/restaurant/dashboard", &owner.user.token).await;
    assert_eq!(response.status().as_u16(), 403);

    let listing: serde_json::Value = app.get_with_token("/dashboard/admin/restaurants?status=banned", &admin.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listing["accounts"].as_array().unwrap().len(), 1);
    assert_eq!(listing["counts"]["banned"], 1);
}

#[actix_web::test]
async fn admin_notes_show_up_in_detail(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_superuser().await;
    let owner = app.create_owner(30).await;

    let response = app.post_with_token(
        &format!("/dashboard/admin/restaurants/{}/add-note", owner.account.account_id),
        &admin.token,
        &serde_json::json!({ "content": "Called the owner about the menu photos" })
    ).await;
    assert_eq!(response.status().as_u16(), 201);

    let detail: serde_json::Value = app.get_with_token(
        &format!("/dashboard/admin/restaurants/{}", owner.account.account_id),
        &admin.token
    ).await.json().await.unwrap();
    assert_eq!(detail["notes"].as_array().unwrap().len(), 1);
    assert_eq!(detail["notes"][0]["content"], "Called the owner about the menu photos");
}

#[actix_web::test]
async fn unknown_account_is_not_found(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_superuser().await;

    let response = app.post_with_token(
        &format!("/dashboard/admin/restaurants/{}/update-status", uuid::Uuid::new_v4()),
        &admin.token,
        &serde_json::json!({ "status": "approved" })
    ).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn search_treats_wildcards_literally(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_superuser().await;
    app.create_owner(20).await;

    let count = |listing: serde_json::Value| listing["accounts"].as_array().unwrap().len();

    let listing: serde_json::Value = app.get_with_token("/dashboard/admin/restaurants?search=tajine", &admin.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(count(listing), 1);

    for search in ["%25", "Dar_Tajine"] {
        let listing: serde_json::Value = app.get_with_token(
                &format!("/dashboard/admin/restaurants?search={}", search),
                &admin.token
            )
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(count(listing), 0, "search {} matched", search);
    }
}
