use crate::helpers::TestApp;

#[actix_web::test]
async fn check_health_route(){
    let app = TestApp::spawn_app().await;

    let response = reqwest::get(format!("{}/health", app.get_app_url()))
                    .await
                    .expect("Failed to get response");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
