use diesel::RunQueryDsl;
use foodflex::{models::SubscriptionPlan, schema::subscription_plans};
use uuid::Uuid;

use crate::helpers::TestApp;

impl TestApp {
    fn seed_plan(&self, plan_type: &str, price_monthly: i32) -> SubscriptionPlan{
        let plan = SubscriptionPlan{
            plan_id: Uuid::new_v4(),
            name: format!("{} premium", plan_type),
            plan_type: plan_type.to_string(),
            price_monthly,
            price_yearly: price_monthly * 10,
            description: String::new(),
            is_active: true,
            is_featured: false,
            max_listings: 1,
            discount_percent: 10
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(subscription_plans::table)
            .values(&plan)
            .execute(&mut conn)
            .unwrap();
        plan
    }
}

#[actix_web::test]
async fn plans_are_listed_by_type(){
    let app = TestApp::spawn_app().await;
    app.seed_plan("user", 499);
    app.seed_plan("restaurant", 2999);

    let plans: serde_json::Value = reqwest::get(format!("{}/subscription/plans?plan_type=restaurant", app.get_app_url()))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(plans.as_array().unwrap().len(), 1);
    assert_eq!(plans[0]["plan_type"], "restaurant");
}

#[actix_web::test]
async fn user_subscribes_then_cancels(){
    let app = TestApp::spawn_app().await;
    let plan = app.seed_plan("user", 499);
    let user = app.create_user().await;

    let response = app.get_with_token("/subscription/my-plan", &user.token).await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app.post_with_token(
        &format!("/subscription/checkout/user/{}?billing=yearly", plan.plan_id),
        &user.token,
        &serde_json::json!({})
    ).await;
    assert_eq!(response.status().as_u16(), 200);
    let subscription: serde_json::Value = response.json().await.unwrap();
    assert_eq!(subscription["status"], "active");

    let current: serde_json::Value = app.get_with_token("/subscription/my-plan", &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(current["is_active"], true);
    assert_eq!(current["days_remaining"], 365);

    let response = app.post_with_token("/subscription/cancel", &user.token, &serde_json::json!({})).await;
    assert_eq!(response.status().as_u16(), 200);

    let current: serde_json::Value = app.get_with_token("/subscription/my-plan", &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(current["subscription"]["status"], "canceled");
    assert_eq!(current["is_active"], false);
}

#[actix_web::test]
async fn restaurant_plan_needs_restaurant_account(){
    let app = TestApp::spawn_app().await;
    let plan = app.seed_plan("restaurant", 2999);
    let user = app.create_user().await;

    let response = app.post_with_token(
        &format!("/subscription/checkout/restaurant/{}", plan.plan_id),
        &user.token,
        &serde_json::json!({})
    ).await;

    assert_eq!(response.status().as_u16(), 403);
}

#[actix_web::test]
async fn plan_of_the_wrong_type_is_rejected(){
    let app = TestApp::spawn_app().await;
    let plan = app.seed_plan("restaurant", 2999);
    let user = app.create_user().await;

    let response = app.post_with_token(
        &format!("/subscription/checkout/user/{}", plan.plan_id),
        &user.token,
        &serde_json::json!({})
    ).await;

    assert_eq!(response.status().as_u16(), 400);
}
