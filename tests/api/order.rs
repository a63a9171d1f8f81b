use uuid::Uuid;

use crate::helpers::TestApp;

#[actix_web::test]
async fn order_total_follows_its_lines(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let tajine = app.seed_dish(owner.restaurant.restaurant_id, "Tajine", "M");
    let tea = app.seed_dish(owner.restaurant.restaurant_id, "Mint tea", "L");

    let response = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "table_number": "7",
        "items": [
            { "dish_id": tajine.dish_id, "quantity": 2 },
            { "dish_id": tea.dish_id, "quantity": 3 }
        ]
    })).await;
    assert_eq!(response.status().as_u16(), 201);

    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["total_amount"], 2 * 1099 + 3 * 599);
    assert_eq!(order["status"], "new");
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    let order_id = order["order_id"].as_str().unwrap().to_string();

    // Adding a dish already on the order merges the line
    let order: serde_json::Value = app.post_with_token(
        &format!("/restaurant/orders/{}/items", order_id),
        &owner.user.token,
        &serde_json::json!({ "dish_id": tea.dish_id, "quantity": 1 })
    ).await.json().await.unwrap();
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
    assert_eq!(order["total_amount"], 2 * 1099 + 4 * 599);

    let tajine_line = order["items"].as_array().unwrap()
        .iter()
        .find(|line| line["dish_id"] == tajine.dish_id.to_string())
        .unwrap()["order_item_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.api_client.delete(format!(
            "{}/restaurant/orders/{}/items/{}",
            app.get_app_url(),
            order_id,
            tajine_line
        ))
        .bearer_auth(&owner.user.token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let order: serde_json::Value = response.json().await.unwrap();
    assert_eq!(order["total_amount"], 4 * 599);
}

#[actix_web::test]
async fn empty_order_is_rejected(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;

    let response = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": []
    })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["items"].is_string());
}

#[actix_web::test]
async fn dish_from_another_restaurant_is_rejected(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let other = app.create_owner(40).await;
    let foreign = app.seed_dish(other.restaurant.restaurant_id, "Pastilla", "H");

    let response = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": [{ "dish_id": foreign.dish_id, "quantity": 1 }]
    })).await;

    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn line_quantities_are_bounded(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let dish = app.seed_dish(owner.restaurant.restaurant_id, "Msemen", "L");

    let response = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": [{ "dish_id": dish.dish_id, "quantity": i32::MAX }]
    })).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["quantity"].is_string());

    // Two lines of the same dish merge past the limit
    let response = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": [
            { "dish_id": dish.dish_id, "quantity": 600 },
            { "dish_id": dish.dish_id, "quantity": 600 }
        ]
    })).await;
    assert_eq!(response.status().as_u16(), 400);

    let order: serde_json::Value = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": [{ "dish_id": dish.dish_id, "quantity": 999 }]
    })).await.json().await.unwrap();
    let items_route = format!("/restaurant/orders/{}/items", order["order_id"].as_str().unwrap());

    let response = app.post_with_token(&items_route, &owner.user.token, &serde_json::json!({
        "dish_id": dish.dish_id, "quantity": i32::MAX
    })).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.post_with_token(&items_route, &owner.user.token, &serde_json::json!({
        "dish_id": dish.dish_id, "quantity": 1
    })).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["quantity"].is_string());
}

#[actix_web::test]
async fn paid_order_is_locked(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let dish = app.seed_dish(owner.restaurant.restaurant_id, "Harira", "L");

    let order: serde_json::Value = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "is_takeaway": true,
        "customer_name": "Hassan",
        "items": [{ "dish_id": dish.dish_id, "quantity": 1 }]
    })).await.json().await.unwrap();
    let order_id = order["order_id"].as_str().unwrap();
    let status_route = format!("/restaurant/orders/{}/status", order_id);

    let response = app.post_with_token(&status_route, &owner.user.token, &serde_json::json!({ "status": "paid" })).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.post_with_token(&status_route, &owner.user.token, &serde_json::json!({ "status": "preparing" })).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app.post_with_token(
        &format!("/restaurant/orders/{}/items", order_id),
        &owner.user.token,
        &serde_json::json!({ "dish_id": dish.dish_id, "quantity": 1 })
    ).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn kitchen_board_groups_active_orders(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let dish = app.seed_dish(owner.restaurant.restaurant_id, "Couscous", "M");

    for _ in 0..2 {
        app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
            "items": [{ "dish_id": dish.dish_id, "quantity": 1 }]
        })).await;
    }

    let board: serde_json::Value = app.get_with_token("/restaurant/kitchen", &owner.user.token)
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(board["new_orders"].as_array().unwrap().len(), 2);
    assert_eq!(board["today_orders"], 2);
    assert_eq!(board["today_revenue"], 0);
}

#[actix_web::test]
async fn orders_of_another_restaurant_are_not_found(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(40).await;
    let other = app.create_owner(40).await;
    let dish = app.seed_dish(owner.restaurant.restaurant_id, "Couscous", "M");

    let order: serde_json::Value = app.post_with_token("/restaurant/orders", &owner.user.token, &serde_json::json!({
        "items": [{ "dish_id": dish.dish_id, "quantity": 1 }]
    })).await.json().await.unwrap();

    let response = app.get_with_token(
        &format!("/restaurant/orders/{}", order["order_id"].as_str().unwrap()),
        &other.user.token
    ).await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app.get_with_token(&format!("/restaurant/orders/{}", Uuid::new_v4()), &owner.user.token).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn customers_cannot_take_orders(){
    let app = TestApp::spawn_app().await;
    let user = app.create_user().await;

    let response = app.get_with_token("/restaurant/orders", &user.token).await;

    assert_eq!(response.status().as_u16(), 403);
}
