use std::net::TcpListener;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, dev::Server, web, App, HttpServer};
use diesel::{r2d2::ConnectionManager, PgConnection};
use r2d2::Pool;
use secrecy::{ExposeSecret, SecretString};
use tracing_actix_web::TracingLogger;

use crate::{
    admin_middleware::AdminMiddlewareFactory,
    auth::jwt::Tokenizer,
    cache::ResponseCache,
    configuration::{DatabaseSettings, Settings},
    email_client::EmailClient,
    routes::{
        admin::*, authentication::*, catalogue::*, health_check, order::*, profile::*, registration::*,
        reservation::*, restaurant::*, subscription::*
    },
    session_state::SessionMiddlewareFactory,
    utils::{BusinessClock, DbPool}
};

// Public url of the app, used in emailed links
pub struct BaseUrl(pub String);

pub struct Application{
    pub host: String,
    pub port: u16,
    pub server: Server
}

impl Application {
    pub async fn new(settings: Settings) -> Result<Self, anyhow::Error>{
        let pool = get_connection_pool(&settings.database)?;
        let email_client = EmailClient::from_settings(&settings.email)?;
        let tokenizer = Tokenizer::new(&settings.jwt);
        let cache = ResponseCache::new(&settings.cache);
        let clock = BusinessClock(settings.application.clock_offset()?);

        let listener = TcpListener::bind((settings.application.host.as_str(), settings.application.port))?;
        let port = listener.local_addr()?.port();
        tracing::info!(host = %settings.application.host, port, "Starting FoodFlex server");

        let server = run(
            listener,
            pool,
            email_client,
            tokenizer,
            cache,
            clock,
            settings.application.base_url.clone(),
            settings.application.hmac_secret
        )?;

        Ok(Application{
            host: settings.application.host,
            port,
            server
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error>{
        self.server.await
    }
}

pub fn get_connection_pool(settings: &DatabaseSettings) -> Result<DbPool, r2d2::Error>{
    Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(settings.get_database_table_url()))
}

#[allow(clippy::too_many_arguments)]
fn run(
    listener: TcpListener,
    pool: DbPool,
    email_client: EmailClient,
    tokenizer: Tokenizer,
    cache: ResponseCache,
    clock: BusinessClock,
    base_url: String,
    hmac_secret: SecretString
) -> Result<Server, anyhow::Error>{
    let pool = web::Data::new(pool);
    let email_client = web::Data::new(email_client);
    let tokenizer = web::Data::new(tokenizer);
    let cache = web::Data::new(cache);
    let clock = web::Data::new(clock);
    let base_url = web::Data::new(BaseUrl(base_url));
    let secret_key = Key::from(hmac_secret.expose_secret().as_bytes());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
                .cookie_secure(false)
                .build())
            .app_data(pool.clone())
            .app_data(email_client.clone())
            .app_data(tokenizer.clone())
            .app_data(cache.clone())
            .app_data(clock.clone())
            .app_data(base_url.clone())
            .route("/health", web::get().to(health_check))
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/cities", web::get().to(get_cities))
            .route("/restaurants", web::get().to(get_restaurants))
            .route("/restaurants/{id}", web::get().to(get_restaurant_by_id))
            .route("/dishes", web::get().to(get_dishes))
            .route("/dishes/{id}", web::get().to(get_dish_by_id))
            .route("/search", web::get().to(get_search))
            .service(
                web::scope("/api")
                    .route("/dishes", web::get().to(get_cached_dishes))
                    .route("/restaurants", web::get().to(get_cached_restaurants))
            )
            .service(
                web::scope("/reservation")
                    .route("/{restaurant_id}", web::post().to(make_reservation))
                    .route("/{restaurant_id}/slots", web::get().to(get_slots))
                    .route("/{restaurant_id}/dates", web::get().to(get_dates))
                    .route("/{restaurant_id}/availability", web::get().to(get_availability))
            )
            .service(
                web::scope("/user")
                    .wrap(SessionMiddlewareFactory)
                    .route("/profile", web::get().to(get_profile))
                    .route("/profile", web::post().to(post_profile))
                    .route("/reservations", web::get().to(get_user_reservations))
                    .route("/reservations/{id}", web::get().to(get_user_reservation))
                    .route("/reservations/{id}/cancel", web::post().to(cancel_user_reservation))
                    .route("/reservations/{id}/modify", web::post().to(modify_user_reservation))
            )
            .service(
                web::scope("/restaurant")
                    .route("/register/finish", web::post().to(post_registration_finish))
                    .route("/register/{step}", web::post().to(post_registration_step))
                    .route("/dashboard", web::get().to(get_restaurant_dashboard))
                    .route("/reservations/{id}/status", web::post().to(update_status_of_reservation))
                    .route("/menu", web::get().to(get_owner_menu))
                    .route("/menu/categories", web::post().to(post_category))
                    .route("/menu/categories/{id}", web::put().to(put_category))
                    .route("/menu/categories/{id}", web::delete().to(remove_category))
                    .route("/menu/dishes", web::post().to(post_dish))
                    .route("/menu/dishes/{id}", web::put().to(put_dish))
                    .route("/menu/dishes/{id}", web::delete().to(remove_dish))
                    .route("/edit", web::post().to(edit_restaurant))
                    .route("/orders", web::get().to(get_orders))
                    .route("/orders", web::post().to(post_order))
                    .route("/orders/{id}", web::get().to(get_order))
                    .route("/orders/{id}/items", web::post().to(post_order_item))
                    .route("/orders/{id}/items/{item_id}", web::delete().to(delete_order_item))
                    .route("/orders/{id}/status", web::post().to(update_status_of_order))
                    .route("/kitchen", web::get().to(get_kitchen))
                    .route("/stats", web::get().to(get_restaurant_stats))
            )
            .service(
                web::scope("/dashboard/admin")
                    .wrap(AdminMiddlewareFactory)
                    .route("/restaurants", web::get().to(get_admin_restaurants))
                    .route("/restaurants/{id}", web::get().to(get_admin_restaurant))
                    .route("/restaurants/{id}/update-status", web::post().to(update_restaurant_status))
                    .route("/restaurants/{id}/add-note", web::post().to(post_admin_note))
                    .route("/drafts", web::get().to(get_drafts))
                    .route("/drafts/{id}/approve", web::post().to(post_approve_draft))
                    .route("/drafts/{id}/reject", web::post().to(post_reject_draft))
            )
            .route("/subscription/plans", web::get().to(get_plans))
            .service(
                web::scope("/subscription")
                    .wrap(SessionMiddlewareFactory)
                    .route("/checkout/{plan_type}/{plan_id}", web::post().to(post_checkout))
                    .route("/my-plan", web::get().to(get_my_plan))
                    .route("/cancel", web::post().to(post_cancel_subscription))
                    .route("/auto-renew", web::post().to(post_auto_renew))
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
