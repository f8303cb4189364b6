pub mod api;
mod config;
mod core;
mod history;
mod providers;
mod schedule;
mod tracker;

use std::sync::Arc;

use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::Config;
use tracker::Tracker;

#[derive(OpenApi)]
#[openapi(
    info(title = "Bondi API", version = "0.2.0"),
    paths(
        api::buses::get_next_bus,
        api::buses::get_eta,
        api::buses::get_schedule,
        api::health::health_check,
    ),
    components(schemas(
        api::ErrorResponse,
        api::buses::NextBusResponse,
        api::buses::EtaResponse,
        api::buses::ScheduleResponse,
        api::health::HealthResponse,
        crate::core::selector::Candidate,
        crate::core::geo::Point,
        schedule::ScheduleEntry,
    )),
    tags(
        (name = "buses", description = "Next-bus and ETA queries"),
        (name = "health", description = "Service health check")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info,sqlx=warn".into()),
        )
        .init();

    // Load config
    let config = Config::load("config.yaml").expect("Failed to load config");
    tracing::info!(
        orion = %config.orion_url,
        montevideo = %config.montevideo_url,
        "Loaded configuration"
    );

    // Build CORS layer based on config
    let cors_layer = if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode explicitly enabled (all origins allowed) - DO NOT USE IN PRODUCTION");
        CorsLayer::permissive()
    } else if !config.cors_origins.is_empty() {
        tracing::info!(origins = ?config.cors_origins, "CORS: Restricting to configured origins");
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    } else {
        panic!("CORS configuration error: Either set 'cors_origins' with allowed origins, or set 'cors_permissive: true' for development");
    };

    // Initialize SQLite database
    let cwd = std::env::current_dir().expect("Failed to get current directory");
    let db_path = cwd.join("database");
    if let Err(e) = std::fs::create_dir_all(&db_path) {
        tracing::warn!("Could not create database directory: {}", e);
    }
    let db_file = db_path.join("fixes.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_file.display());
    let pool = SqlitePool::connect(&db_url)
        .await
        .expect("Failed to connect to SQLite database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database migrations completed");

    let tracker = Arc::new(Tracker::new(&config, pool).expect("Failed to initialize tracker"));

    // Register the live-feed subscription. Failure is logged, not retried:
    // the service still answers next-bus queries without it, only ingest
    // stays idle until a restart.
    if let Err(e) = tracker.subscribe().await {
        tracing::error!(error = %e, "Failed to subscribe to bus location changes");
    }

    // Build the app
    let app = axum::Router::new()
        .route("/", axum::routing::get(root))
        .merge(api::router(tracker.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    // Start server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");

    tracing::info!("Server running on http://localhost:3000");
    tracing::info!("Swagger UI: http://localhost:3000/swagger-ui");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tracker))
        .await
        .expect("Failed to start server");
}

async fn root() -> &'static str {
    "Bondi API"
}

/// Waits for Ctrl-C, then tears down the live-feed subscription so the
/// broker stops delivering to a dead webhook.
async fn shutdown_signal(tracker: Arc<Tracker>) {
    if tokio::signal::ctrl_c().await.is_err() {
        return;
    }
    tracing::info!("Shutting down");
    if let Err(e) = tracker.unsubscribe().await {
        tracing::warn!(error = %e, "Failed to tear down subscription");
    }
}
