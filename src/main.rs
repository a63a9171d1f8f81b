use foodflex::{configuration::Settings, startup::Application, telemetry::{get_subscriber, init_subscriber}};

#[actix_web::main]
async fn main() -> anyhow::Result<()>{
    let subscriber = get_subscriber("foodflex".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = Settings::get()?;

    let application = Application::new(settings).await?;
    application.run_until_stopped().await?;
    Ok(())
}
