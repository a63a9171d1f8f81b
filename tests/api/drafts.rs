use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use foodflex::schema::restaurant_status_history;
use wiremock::{matchers::{method, path}, Mock, ResponseTemplate};

use crate::helpers::TestApp;

impl TestApp {
    async fn post_step(&self, step: &str, body: &serde_json::Value) -> reqwest::Response{
        self.api_client.post(format!("{}/restaurant/register/{}", self.get_app_url(), step))
            .json(body)
            .send()
            .await
            .expect("Failed to send registration step")
    }

    async fn finish_registration(&self) -> reqwest::Response{
        self.api_client.post(format!("{}/restaurant/register/finish", self.get_app_url()))
            .send()
            .await
            .expect("Failed to finish registration")
    }

    // Walks the three wizard steps and returns the created draft
    async fn register_restaurant(&self, city_id: uuid::Uuid) -> serde_json::Value{
        let response = self.post_step("basic_info", &serde_json::json!({
            "name": "Riad Zitoun",
            "city_id": city_id,
            "address": "5 derb Zitoun",
            "phone": "0524123456",
            "email": "hello@riadzitoun.ma",
            "description": "Rooftop dining",
            "capacity": 24
        })).await;
        assert_eq!(response.status().as_u16(), 200);

        let response = self.post_step("owner_info", &serde_json::json!({
            "owner_first_name": "Fatima",
            "owner_last_name": "Zahra",
            "owner_email": "fatima@riadzitoun.ma",
            "owner_phone": "0661234567"
        })).await;
        assert_eq!(response.status().as_u16(), 200);

        let response = self.post_step("documents", &serde_json::json!({
            "owner_id_card": "uploads/id.pdf",
            "business_registration": "uploads/registration.pdf",
            "food_safety_certificate": "uploads/safety.pdf",
            "main_image": "uploads/main.jpg",
            "interior_image": "uploads/interior.jpg",
            "menu_sample": "uploads/menu.pdf"
        })).await;
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["completed_steps"].as_array().unwrap().len(), 3);

        let response = self.finish_registration().await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

#[actix_web::test]
async fn unknown_step_is_not_found(){
    let app = TestApp::spawn_app().await;

    let response = app.post_step("payment", &serde_json::json!({})).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn invalid_step_reports_fields(){
    let app = TestApp::spawn_app().await;

    let response = app.post_step("owner_info", &serde_json::json!({
        "owner_first_name": "",
        "owner_last_name": "Zahra",
        "owner_email": "nope",
        "owner_phone": "0661234567"
    })).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["owner_first_name"].is_string());
    assert!(body["errors"]["owner_email"].is_string());
}

#[actix_web::test]
async fn finishing_early_lists_incomplete_steps(){
    let app = TestApp::spawn_app().await;
    let city = app.seed_city();

    app.post_step("basic_info", &serde_json::json!({
        "name": "Riad Zitoun",
        "city_id": city.city_id,
        "address": "5 derb Zitoun",
        "phone": "0524123456",
        "email": "hello@riadzitoun.ma"
    })).await;

    let response = app.finish_registration().await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"].get("basic_info").is_none());
    assert_eq!(body["errors"]["owner_info"], "This step is incomplete");
    assert_eq!(body["errors"]["documents"], "This step is incomplete");
}

#[actix_web::test]
async fn approving_draft_creates_working_owner_account(){
    let app = TestApp::spawn_app().await;
    let admin = app.create_superuser().await;
    let city = app.seed_city();

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&app.email_api)
        .await;

    let draft = app.register_restaurant(city.city_id).await;
    assert_eq!(draft["status"], "pending");

    let pending: serde_json::Value = app.get_with_token("/dashboard/admin/drafts?status=pending", &admin.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let response = app.post_with_token(
        &format!("/dashboard/admin/drafts/{}/approve", draft["draft_id"].as_str().unwrap()),
        &admin.token,
        &serde_json::json!({})
    ).await;
    assert_eq!(response.status().as_u16(), 200);

    let approved: serde_json::Value = response.json().await.unwrap();
    assert_eq!(approved["draft"]["status"], "approved");
    assert_eq!(approved["account"]["status"], "approved");
    assert_eq!(approved["account"]["is_active"], true);
    assert_eq!(approved["restaurant"]["capacity"], 24);
    assert!(approved["username"].as_str().unwrap().starts_with("fatima_"));

    let account_id: uuid::Uuid = approved["account"]["account_id"].as_str().unwrap().parse().unwrap();
    let mut conn = app.pool.get().unwrap();
    let history: Vec<String> = restaurant_status_history::table
        .filter(restaurant_status_history::account_id.eq(account_id))
        .select(restaurant_status_history::new_status)
        .load(&mut conn)
        .unwrap();
    assert_eq!(history, vec!["approved".to_string()]);

    // A draft is reviewed once
    let response = app.post_with_token(
        &format!("/dashboard/admin/drafts/{}/reject", draft["draft_id"].as_str().unwrap()),
        &admin.token,
        &serde_json::json!({ "notes": "Too late" })
    ).await;
    assert_eq!(response.status().as_u16(), 409);

    // Owner, admins and the credentials email
    actix_web::rt::time::sleep(std::time::Duration::from_millis(300)).await;
    let requests = app.email_api.received_requests().await.unwrap();
    assert!(requests.len() >= 3);
    let credentials = requests.iter()
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .find(|body| body.contains("Password:"));
    assert!(credentials.is_some());
}

#[actix_web::test]
async fn rejecting_draft_keeps_notes(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let admin = app.create_superuser().await;
    let city = app.seed_city();

    let draft = app.register_restaurant(city.city_id).await;

    let response = app.post_with_token(
        &format!("/dashboard/admin/drafts/{}/reject", draft["draft_id"].as_str().unwrap()),
        &admin.token,
        &serde_json::json!({ "notes": "Food safety certificate expired" })
    ).await;
    assert_eq!(response.status().as_u16(), 200);

    let rejected: serde_json::Value = response.json().await.unwrap();
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["admin_notes"], "Food safety certificate expired");
}
