use std::error::Error;

use chrono::{Duration, NaiveDate, Utc};
use diesel::{pg::Pg, r2d2::ConnectionManager, Connection, ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use foodflex::{
    configuration::{DatabaseSettings, Settings},
    models::{City, Dish, Restaurant, RestaurantAccount},
    schema::{cities, dishes, restaurant_accounts, restaurants, users},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
    utils::{BusinessClock, DbPool}
};
use once_cell::sync::Lazy;
use r2d2::Pool;
use reqwest::redirect::Policy;
use serde::Deserialize;
use uuid::Uuid;
use wiremock::{matchers::{method, path}, Mock, MockServer, ResponseTemplate};

static LOGGER_INSTANCE: Lazy<()> = Lazy::new(|| {
    let log_level = "info".to_string();
    let name = "foodflex-test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(name, log_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(name, log_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub const TEST_PASSWORD: &str = "correct-horse-battery";

fn run_migrations(connection: &mut impl MigrationHarness<Pg>)
    -> Result<(), Box<dyn Error + Send + Sync + 'static>>
{
    connection.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[derive(Deserialize, Debug)]
pub struct LoginResponse{
    pub token: String,
    pub account_kind: String,
    pub user_id: Uuid
}

// A signed up user and the bearer token it logged in with
pub struct TestUser{
    pub user_id: Uuid,
    pub username: String,
    pub token: String
}

pub struct TestOwner{
    pub user: TestUser,
    pub restaurant: Restaurant,
    pub account: RestaurantAccount
}

pub struct TestApp{
    pub host: String,
    pub port: u16,
    pub pool: DbPool,
    pub email_api: MockServer,
    pub api_client: reqwest::Client,
    pub clock: BusinessClock
}

impl TestApp {
    fn create_db(settings: &DatabaseSettings) -> DbPool{
        let mut connection = PgConnection::establish(&settings.get_database_url())
                                .expect("Failed to connect to postgres database");

        let query = format!(r#"CREATE DATABASE "{}";"#, settings.name);
        diesel::sql_query(query)
            .execute(&mut connection)
            .expect("Failed to create test database");

        let pool = Pool::new(ConnectionManager::<PgConnection>::new(settings.get_database_table_url()))
            .expect("Failed to build connection pool to test database");

        let mut conn = pool.get().expect("Failed to get connection to test database");
        run_migrations(&mut conn).expect("Failed to run migrations");

        pool
    }

    pub fn get_app_url(&self) -> String{
        format!("http://{}:{}", self.host, self.port)
    }

    pub async fn spawn_app() -> TestApp{
        Lazy::force(&LOGGER_INSTANCE);

        let email_api = MockServer::start().await;

        let mut settings = Settings::get().expect("Failed to read configuration");
        settings.application.port = 0;
        settings.database.name = Uuid::new_v4().to_string();
        settings.email.api_uri = email_api.uri();

        let pool = TestApp::create_db(&settings.database);
        let clock = BusinessClock(settings.application.clock_offset().expect("Invalid clock offset"));

        let application = Application::new(settings)
                            .await
                            .expect("Failed to build application");

        let host = application.host.clone();
        let port = application.port;
        tokio::task::spawn(application.server);

        let api_client = reqwest::Client::builder()
                            .redirect(Policy::none())
                            .cookie_store(true)
                            .build()
                            .unwrap();

        TestApp{
            host,
            port,
            pool,
            email_api,
            api_client,
            clock
        }
    }

    // Accept every outgoing email, for tests that don't inspect them
    pub async fn accept_emails(&self){
        Mock::given(path("/email"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_api)
            .await;
    }

    pub async fn post_signup(&self, body: &serde_json::Value) -> reqwest::Response{
        self.api_client.post(format!("{}/signup", self.get_app_url()))
            .json(body)
            .send()
            .await
            .expect("Failed to send request to signup endpoint")
    }

    pub async fn post_login(&self, login: &str, password: &str) -> reqwest::Response{
        self.api_client.post(format!("{}/login", self.get_app_url()))
            .json(&serde_json::json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to send request to login endpoint")
    }

    pub async fn signup(&self, username: &str) -> Uuid{
        let response = self.post_signup(&serde_json::json!({
            "username": username,
            "email": format!("{}@foodflex.ma", username),
            "first_name": "Test",
            "last_name": "User",
            "password": TEST_PASSWORD,
            "confirm_password": TEST_PASSWORD
        })).await;
        assert_eq!(response.status().as_u16(), 201);

        let body: serde_json::Value = response.json().await.unwrap();
        body["user_id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn login(&self, username: &str) -> LoginResponse{
        let response = self.post_login(username, TEST_PASSWORD).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.unwrap()
    }

    pub async fn create_user(&self) -> TestUser{
        let username = format!("user_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let user_id = self.signup(&username).await;
        let token = self.login(&username).await.token;

        TestUser{ user_id, username, token }
    }

    pub async fn create_superuser(&self) -> TestUser{
        let username = format!("admin_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let user_id = self.signup(&username).await;

        let mut conn = self.pool.get().unwrap();
        diesel::update(users::table.find(user_id))
            .set(users::is_superuser.eq(true))
            .execute(&mut conn)
            .unwrap();

        let token = self.login(&username).await.token;
        TestUser{ user_id, username, token }
    }

    pub fn seed_city(&self) -> City{
        let city = City{
            city_id: Uuid::new_v4(),
            name: "Fes".to_string(),
            description: "Imperial city".to_string(),
            population: 1_150_000,
            is_active: true
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(cities::table)
            .values(&city)
            .execute(&mut conn)
            .unwrap();
        city
    }

    pub fn seed_restaurant(&self, city_id: Uuid, capacity: i32) -> Restaurant{
        let restaurant = Restaurant{
            restaurant_id: Uuid::new_v4(),
            name: "Dar Tajine".to_string(),
            city_id,
            address: "12 rue Talaa Kebira".to_string(),
            phone: "0535123456".to_string(),
            email: "contact@dartajine.ma".to_string(),
            website: String::new(),
            description: "Slow cooked tajines".to_string(),
            capacity,
            is_open: true,
            created_at: Utc::now()
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(restaurants::table)
            .values(&restaurant)
            .execute(&mut conn)
            .unwrap();
        restaurant
    }

    /// Seeds a restaurant with an approved account held by a fresh user,
    /// then logs that user in so the token carries the owner role.
    pub async fn create_owner(&self, capacity: i32) -> TestOwner{
        let city = self.seed_city();
        let restaurant = self.seed_restaurant(city.city_id, capacity);

        let username = format!("owner_{}", &Uuid::new_v4().simple().to_string()[..8]);
        let user_id = self.signup(&username).await;

        let account = RestaurantAccount{
            account_id: Uuid::new_v4(),
            user_id,
            restaurant_id: restaurant.restaurant_id,
            status: "approved".to_string(),
            is_active: true,
            pending_approval: false,
            rejection_reason: None,
            sanction_reason: None,
            ban_reason: None,
            status_changed_at: None,
            status_changed_by: None,
            account_type: "basic".to_string(),
            created_at: Utc::now()
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(restaurant_accounts::table)
            .values(&account)
            .execute(&mut conn)
            .unwrap();

        let token = self.login(&username).await.token;

        TestOwner{
            user: TestUser{ user_id, username, token },
            restaurant,
            account
        }
    }

    pub fn seed_dish(&self, restaurant_id: Uuid, name: &str, price_range: &str) -> Dish{
        let dish = Dish{
            dish_id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            price_range: price_range.to_string(),
            dish_type: "salty".to_string(),
            is_vegetarian: false,
            is_vegan: false,
            ingredients: None,
            city_id: None,
            restaurant_id: Some(restaurant_id),
            category_id: None,
            origin: "moroccan".to_string(),
            created_at: Utc::now()
        };

        let mut conn = self.pool.get().unwrap();
        diesel::insert_into(dishes::table)
            .values(&dish)
            .execute(&mut conn)
            .unwrap();
        dish
    }

    pub async fn get_with_token(&self, route: &str, token: &str) -> reqwest::Response{
        self.api_client.get(format!("{}{}", self.get_app_url(), route))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post_with_token(&self, route: &str, token: &str, body: &serde_json::Value) -> reqwest::Response{
        self.api_client.post(format!("{}{}", self.get_app_url(), route))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to send request")
    }
}

// A bookable date a week out, clear of the past on any local offset
pub fn next_week() -> NaiveDate{
    Utc::now().date_naive() + Duration::days(7)
}

pub fn reservation_body(date: NaiveDate, time: &str, guests: i32) -> serde_json::Value{
    serde_json::json!({
        "name": "Amina Benali",
        "email": "amina@example.com",
        "phone": "0612345678",
        "date": date.to_string(),
        "time": time,
        "guests": guests
    })
}
