use std::time::Duration;

use agrimarket_api::{build_router, state::AppState};
use agrimarket_config::Settings;
use agrimarket_db::{connect, indexes::ensure_indexes};
use agrimarket_services::InvitationSweeper;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "agrimarket_api=debug,agrimarket_services=debug,agrimarket_db=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting AgriMarket API on {}:{}", settings.app.host, settings.app.port);

    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());

    let _sweeper = InvitationSweeper::new(
        app_state.invitations.clone(),
        Duration::from_secs(settings.invitations.sweep_interval_secs),
    )
    .spawn();

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
