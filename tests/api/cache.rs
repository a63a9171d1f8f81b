use crate::helpers::TestApp;

impl TestApp {
    async fn cache_status(&self, route: &str) -> String{
        let response = reqwest::get(format!("{}{}", self.get_app_url(), route))
            .await
            .expect("Failed to send request");
        assert_eq!(response.status().as_u16(), 200);

        response.headers()
            .get("X-Cache")
            .expect("Missing cache status header")
            .to_str()
            .unwrap()
            .to_string()
    }
}

#[actix_web::test]
async fn dish_listing_is_cached_until_a_dish_changes(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(30).await;

    assert_eq!(app.cache_status("/api/dishes").await, "MISS");
    assert_eq!(app.cache_status("/api/dishes").await, "HIT");

    let response = app.post_with_token("/restaurant/menu/dishes", &owner.user.token, &serde_json::json!({
        "name": "Rfissa",
        "price_range": "M",
        "dish_type": "salty"
    })).await;
    assert_eq!(response.status().as_u16(), 201);

    assert_eq!(app.cache_status("/api/dishes").await, "MISS");

    let dishes: serde_json::Value = reqwest::get(format!("{}/api/dishes", app.get_app_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(dishes.as_array().unwrap().iter().any(|dish| dish["name"] == "Rfissa"));
}

#[actix_web::test]
async fn restaurant_listing_is_invalidated_by_moderation(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let admin = app.create_superuser().await;
    let owner = app.create_owner(30).await;

    assert_eq!(app.cache_status("/api/restaurants").await, "MISS");
    assert_eq!(app.cache_status("/api/restaurants").await, "HIT");
    // Dish writes leave the restaurant listing alone
    app.post_with_token("/restaurant/menu/dishes", &owner.user.token, &serde_json::json!({
        "name": "Seffa",
        "price_range": "L",
        "dish_type": "sweet"
    })).await;
    assert_eq!(app.cache_status("/api/restaurants").await, "HIT");

    app.post_with_token(
        &format!("/dashboard/admin/restaurants/{}/update-status", owner.account.account_id),
        &admin.token,
        &serde_json::json!({ "status": "sanctioned", "reason": "Late payments" })
    ).await;

    assert_eq!(app.cache_status("/api/restaurants").await, "MISS");
}
