pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderValue,
    routing::{get, post, put},
};
use extractors::role::{Factory, Farmer, Hhm, Labour};
use serde_json::{Value, json};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/refresh", post(routes::auth::refresh))
        .route("/me", get(routes::profile::me));

    let farmer_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile::<Farmer>)
                .put(routes::profile::update_profile::<Farmer>),
        )
        .route("/listings", get(routes::listing::mine))
        .route("/orders", get(routes::order::list_for_farmer));

    let factory_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile::<Factory>)
                .put(routes::profile::update_profile::<Factory>),
        )
        .route("/hhms", get(routes::profile::factory_hhms))
        .route("/orders", get(routes::order::list_for_factory))
        .route(
            "/invitations",
            get(routes::invitation::list::<Factory>).post(routes::invitation::create::<Factory>),
        )
        .route(
            "/invitations/{invitation_id}/respond",
            post(routes::invitation::respond::<Factory>),
        );

    let hhm_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile::<Hhm>).put(routes::profile::update_profile::<Hhm>),
        )
        .route("/workers", get(routes::profile::hhm_workers))
        .route("/factories", get(routes::profile::hhm_factories))
        .route(
            "/schedules",
            get(routes::schedule::list_mine).post(routes::schedule::create),
        )
        .route(
            "/schedules/{schedule_id}",
            put(routes::schedule::update).delete(routes::schedule::delete),
        )
        .route(
            "/schedules/{schedule_id}/applications",
            get(routes::application::list_for_schedule),
        )
        .route(
            "/applications/{application_id}/respond",
            post(routes::application::respond),
        )
        .route(
            "/invitations",
            get(routes::invitation::list::<Hhm>).post(routes::invitation::create::<Hhm>),
        )
        .route(
            "/invitations/{invitation_id}/respond",
            post(routes::invitation::respond::<Hhm>),
        );

    let worker_routes = Router::new()
        .route(
            "/profile",
            get(routes::profile::get_profile::<Labour>)
                .put(routes::profile::update_profile::<Labour>),
        )
        .route("/schedules", get(routes::schedule::list_open))
        .route(
            "/schedules/{schedule_id}/apply",
            post(routes::application::apply),
        )
        .route("/applications", get(routes::application::list_mine))
        .route(
            "/applications/{application_id}/withdraw",
            post(routes::application::withdraw),
        )
        .route("/invitations", get(routes::invitation::list::<Labour>))
        .route(
            "/invitations/{invitation_id}/respond",
            post(routes::invitation::respond::<Labour>),
        );

    let listing_routes = Router::new()
        .route(
            "/",
            get(routes::listing::list).post(routes::listing::create),
        )
        .route(
            "/{listing_id}",
            get(routes::listing::get)
                .put(routes::listing::update)
                .delete(routes::listing::delete),
        );

    let order_routes = Router::new()
        .route("/", post(routes::order::create))
        .route("/{order_id}", get(routes::order::get))
        .route("/{order_id}/accept", post(routes::order::accept))
        .route("/{order_id}/reject", post(routes::order::reject))
        .route("/{order_id}/cancel", post(routes::order::cancel));

    let contract_routes = Router::new()
        .route(
            "/",
            get(routes::contract::list).post(routes::contract::create),
        )
        .route("/{contract_id}", get(routes::contract::get))
        .route("/{contract_id}/accept", post(routes::contract::accept))
        .route("/{contract_id}/reject", post(routes::contract::reject))
        .route("/{contract_id}/cancel", post(routes::contract::cancel))
        .route("/{contract_id}/complete", post(routes::contract::complete));

    let analytics_routes = Router::new()
        .route("/dashboard", get(routes::analytics::dashboard))
        .route("/market", get(routes::analytics::market));

    let public_routes = Router::new()
        .route("/listings", get(routes::public::listings))
        .route("/stats", get(routes::public::stats))
        .route("/factories", get(routes::public::factories))
        .route("/hhms", get(routes::public::hhms));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/farmer", farmer_routes)
        .nest("/factory", factory_routes)
        .nest("/hhm", hhm_routes)
        .nest("/worker", worker_routes)
        .nest("/listings", listing_routes)
        .nest("/orders", order_routes)
        .nest("/contracts", contract_routes)
        .nest("/analytics", analytics_routes)
        .nest("/public", public_routes);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when none are configured, otherwise the configured list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(parsed))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = match agrimarket_db::ping(&state.db).await {
        Ok(_) => "up",
        Err(e) => {
            warn!(error = %e, "Health check ping failed");
            "down"
        }
    };
    Json(json!({
        "status": "ok",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
