use chrono::{Duration, Utc};
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use foodflex::schema::reservations;
use futures_util::future::join_all;
use uuid::Uuid;
use wiremock::{matchers::{method, path}, Mock, ResponseTemplate};

use crate::helpers::{next_week, reservation_body, TestApp, TestUser};

impl TestApp {
    pub async fn post_reservation(&self, restaurant_id: Uuid, body: &serde_json::Value, token: Option<&str>) -> reqwest::Response{
        let mut request = self.api_client.post(format!("{}/reservation/{}", self.get_app_url(), restaurant_id))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request.send()
            .await
            .expect("Failed to send request to reservation endpoint")
    }

    pub async fn modify_reservation(&self, reservation_id: &str, body: &serde_json::Value, user: &TestUser) -> reqwest::Response{
        self.post_with_token(&format!("/user/reservations/{}/modify", reservation_id), &user.token, body).await
    }
}

// Books through the API and returns the new reservation id
async fn book(app: &TestApp, restaurant_id: Uuid, body: &serde_json::Value, user: Option<&TestUser>) -> String{
    let response = app.post_reservation(restaurant_id, body, user.map(|u| u.token.as_str())).await;
    assert_eq!(response.status().as_u16(), 201);

    let created: serde_json::Value = response.json().await.unwrap();
    created["reservation_id"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn guest_can_book_and_gets_confirmation_email(){
    let app = TestApp::spawn_app().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);

    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_api)
        .await;

    let response = app.post_reservation(
        restaurant.restaurant_id,
        &reservation_body(next_week(), "19:00:00", 4),
        None
    ).await;

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "pending");
    assert_eq!(body["guests"], 4);
    assert_eq!(body["confirmation_code"].as_str().unwrap().len(), 6);
    assert!(body["user_id"].is_null());

    // Confirmation goes out in the background
    actix_web::rt::time::sleep(std::time::Duration::from_millis(300)).await;
}

#[actix_web::test]
async fn booking_over_capacity_is_rejected(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let date = next_week();

    let first = app.post_reservation(restaurant.restaurant_id, &reservation_body(date, "20:00:00", 6), None).await;
    assert_eq!(first.status().as_u16(), 201);

    let second = app.post_reservation(restaurant.restaurant_id, &reservation_body(date, "20:00:00", 5), None).await;
    assert_eq!(second.status().as_u16(), 400);
    let body: serde_json::Value = second.json().await.unwrap();
    assert!(body["errors"]["non_field_errors"].is_string());

    // Another slot on the same day still has room
    let other_slot = app.post_reservation(restaurant.restaurant_id, &reservation_body(date, "20:30:00", 5), None).await;
    assert_eq!(other_slot.status().as_u16(), 201);
}

#[actix_web::test]
async fn booking_in_the_past_reports_date_error(){
    let app = TestApp::spawn_app().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let last_week = Utc::now().date_naive() - Duration::days(7);

    let response = app.post_reservation(restaurant.restaurant_id, &reservation_body(last_week, "19:00:00", 2), None).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["date"].is_string());
}

#[actix_web::test]
async fn booking_outside_service_hours_reports_time_error(){
    let app = TestApp::spawn_app().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);

    let response = app.post_reservation(restaurant.restaurant_id, &reservation_body(next_week(), "16:00:00", 2), None).await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["time"].is_string());
}

#[actix_web::test]
async fn booking_unknown_restaurant_is_not_found(){
    let app = TestApp::spawn_app().await;

    let response = app.post_reservation(Uuid::new_v4(), &reservation_body(next_week(), "19:00:00", 2), None).await;

    assert_eq!(response.status().as_u16(), 404);
}

#[actix_web::test]
async fn slots_reflect_remaining_seats(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let date = next_week();

    app.post_reservation(restaurant.restaurant_id, &reservation_body(date, "12:00:00", 10), None).await;

    let response = reqwest::get(format!(
        "{}/reservation/{}/slots?date={}",
        app.get_app_url(),
        restaurant.restaurant_id,
        date
    )).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    let slots = body["slots"].as_array().unwrap();
    let noon = slots.iter().find(|s| s["time"] == "12:00:00").unwrap();
    assert_eq!(noon["available"], false);
    assert_eq!(noon["remaining"], 0);
    let half_past = slots.iter().find(|s| s["time"] == "12:30:00").unwrap();
    assert_eq!(half_past["remaining"], 10);

    let response = reqwest::get(format!(
        "{}/reservation/{}/availability?date={}&time=12:00:00&guests=1",
        app.get_app_url(),
        restaurant.restaurant_id,
        date
    )).await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["available"], false);
}

#[actix_web::test]
async fn logged_in_user_can_list_and_cancel_reservation(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let user = app.create_user().await;
    let date = next_week();

    let created: serde_json::Value = app.post_reservation(
        restaurant.restaurant_id,
        &reservation_body(date, "19:30:00", 8),
        Some(&user.token)
    ).await.json().await.unwrap();
    let reservation_id = created["reservation_id"].as_str().unwrap();
    assert_eq!(created["user_id"], user.user_id.to_string());

    let listed: serde_json::Value = app.get_with_token("/user/reservations", &user.token)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["can_cancel"], true);
    assert_eq!(listed[0]["can_modify"], true);

    let response = app.post_with_token(
        &format!("/user/reservations/{}/cancel", reservation_id),
        &user.token,
        &serde_json::json!({ "reason": "Change of plans" })
    ).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "canceled");
    assert!(body["notes"].as_str().unwrap().contains("Cancellation reason: Change of plans"));

    // A canceled booking frees its seats
    let response = app.post_reservation(restaurant.restaurant_id, &reservation_body(date, "19:30:00", 10), None).await;
    assert_eq!(response.status().as_u16(), 201);

    // Canceling twice is refused
    let response = app.post_with_token(
        &format!("/user/reservations/{}/cancel", reservation_id),
        &user.token,
        &serde_json::json!({})
    ).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn user_cannot_see_reservation_of_another_user(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let owner = app.create_user().await;
    let stranger = app.create_user().await;

    let created: serde_json::Value = app.post_reservation(
        restaurant.restaurant_id,
        &reservation_body(next_week(), "19:00:00", 2),
        Some(&owner.token)
    ).await.json().await.unwrap();

    let response = app.get_with_token(
        &format!("/user/reservations/{}", created["reservation_id"].as_str().unwrap()),
        &stranger.token
    ).await;

    assert_eq!(response.status().as_u16(), 403);
}

#[actix_web::test]
async fn restaurant_owner_confirms_reservation(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let owner = app.create_owner(20).await;

    let created: serde_json::Value = app.post_reservation(
        owner.restaurant.restaurant_id,
        &reservation_body(next_week(), "21:00:00", 3),
        None
    ).await.json().await.unwrap();
    let route = format!("/restaurant/reservations/{}/status", created["reservation_id"].as_str().unwrap());

    let response = app.post_with_token(&route, &owner.user.token, &serde_json::json!({ "status": "confirmed" })).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.post_with_token(&route, &owner.user.token, &serde_json::json!({ "status": "pending" })).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn modifying_within_the_same_slot_ignores_own_seats(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let user = app.create_user().await;
    let date = next_week();

    let reservation_id = book(&app, restaurant.restaurant_id, &reservation_body(date, "19:00:00", 6), Some(&user)).await;

    let response = app.modify_reservation(&reservation_id, &reservation_body(date, "19:00:00", 10), &user).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["guests"], 10);
    assert_eq!(body["reservation_id"], reservation_id);
}

#[actix_web::test]
async fn modifying_into_a_full_slot_is_rejected(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let user = app.create_user().await;
    let date = next_week();

    let reservation_id = book(&app, restaurant.restaurant_id, &reservation_body(date, "19:00:00", 2), Some(&user)).await;
    book(&app, restaurant.restaurant_id, &reservation_body(date, "20:00:00", 9), None).await;

    let response = app.modify_reservation(&reservation_id, &reservation_body(date, "20:00:00", 2), &user).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["non_field_errors"].is_string());

    // The new values are validated like a fresh booking
    let response = app.modify_reservation(&reservation_id, &reservation_body(date, "16:00:00", 2), &user).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["errors"]["time"].is_string());
}

#[actix_web::test]
async fn reservation_starting_within_a_day_cannot_be_modified(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let user = app.create_user().await;

    let reservation_id = book(&app, restaurant.restaurant_id, &reservation_body(next_week(), "19:00:00", 2), Some(&user)).await;

    // Move the booking to a few hours from now, bypassing the booking rules
    let soon = app.clock.now() + Duration::hours(3);
    let mut conn = app.pool.get().unwrap();
    diesel::update(reservations::table.find(reservation_id.parse::<Uuid>().unwrap()))
        .set((
            reservations::reservation_date.eq(soon.date()),
            reservations::reservation_time.eq(soon.time())
        ))
        .execute(&mut conn)
        .unwrap();

    let response = app.modify_reservation(&reservation_id, &reservation_body(next_week(), "20:00:00", 2), &user).await;
    assert_eq!(response.status().as_u16(), 400);
}

#[actix_web::test]
async fn guest_reservation_cannot_be_modified_by_a_user(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let user = app.create_user().await;
    let date = next_week();

    let reservation_id = book(&app, restaurant.restaurant_id, &reservation_body(date, "19:00:00", 2), None).await;

    let response = app.modify_reservation(&reservation_id, &reservation_body(date, "19:30:00", 2), &user).await;
    assert_eq!(response.status().as_u16(), 403);
}

#[actix_web::test]
async fn concurrent_bookings_never_exceed_capacity(){
    let app = TestApp::spawn_app().await;
    app.accept_emails().await;
    let city = app.seed_city();
    let restaurant = app.seed_restaurant(city.city_id, 10);
    let date = next_week();
    let body = reservation_body(date, "19:00:00", 3);

    let responses = join_all(
        (0..8).map(|_| app.post_reservation(restaurant.restaurant_id, &body, None))
    ).await;

    let statuses: Vec<u16> = responses.iter().map(|r| r.status().as_u16()).collect();
    assert!(statuses.iter().all(|s| *s == 201 || *s == 400), "unexpected statuses {:?}", statuses);
    assert_eq!(statuses.iter().filter(|s| **s == 201).count(), 3);

    let mut conn = app.pool.get().unwrap();
    let guests: Vec<i32> = reservations::table
        .filter(reservations::restaurant_id.eq(restaurant.restaurant_id))
        .filter(reservations::reservation_date.eq(date))
        .select(reservations::guests)
        .load(&mut conn)
        .unwrap();
    assert_eq!(guests.iter().sum::<i32>(), 9);
}
