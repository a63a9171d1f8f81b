use crate::helpers::TestApp;

#[actix_web::test]
async fn stats_cover_the_requested_range(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(20).await;

    let response = app.get_with_token("/restaurant/stats?from=2024-06-01&to=2024-06-07", &owner.user.token).await;
    assert_eq!(response.status().as_u16(), 200);

    let report: serde_json::Value = response.json().await.unwrap();
    assert_eq!(report["start_date"], "2024-06-01");
    assert_eq!(report["end_date"], "2024-06-07");
    assert_eq!(report["daily"].as_array().unwrap().len(), 7);
    assert_eq!(report["orders_count"], 0);
}

#[actix_web::test]
async fn stats_reject_ranges_longer_than_a_year(){
    let app = TestApp::spawn_app().await;
    let owner = app.create_owner(20).await;

    let response = app.get_with_token("/restaurant/stats?from=0001-01-01&to=9999-12-31", &owner.user.token).await;
    assert_eq!(response.status().as_u16(), 400);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["from"].is_string());
}
