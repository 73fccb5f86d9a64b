//! Quotes Backend
//!
//! A read-mostly REST backend serving quotes grouped by series, with SQLite
//! persistence and a static single-page front-end.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod ratelimit;
mod seed;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue},
    middleware,
    routing::{any, get, post, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Store;
use ratelimit::RateLimiter;
use seed::SeedPaths;

/// Largest accepted JSON request body.
const MAX_BODY_BYTES: usize = 10 * 1024;

/// Headers attached to every response.
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    ),
    (
        "content-security-policy",
        "default-src 'self'; style-src 'self' https://fonts.googleapis.com; font-src 'self' https://fonts.gstatic.com; img-src 'self' data:; script-src 'self'; connect-src 'self'; object-src 'none'; base-uri 'self'; frame-ancestors 'none'; form-action 'self'",
    ),
];

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_window, config.rate_limit_max);
        Self {
            store: Arc::new(store),
            limiter: Arc::new(limiter),
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quotes Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Static files: {:?}", config.public_dir);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.writes_enabled {
        tracing::warn!("Public quote submission is enabled (QUOTES_WRITES_ENABLED)");
    } else {
        tracing::info!("Running in read-only mode");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let store = Store::new(pool);

    // Seed series and import quotes on first start
    let paths = SeedPaths {
        seed_sql: &config.seed_sql_path,
        quotes_json: &config.quotes_json_path,
    };
    let report = seed::bootstrap(&store, paths, config.reimport).await?;
    tracing::info!(
        seeded_series = report.seeded_series,
        imported = report.import.is_some(),
        "Bootstrap complete"
    );

    let bind_addr = config.bind_addr;
    let state = AppState::new(store, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let writes_enabled = state.config.writes_enabled;

    // Single-quote route: GET always, writes depending on deployment
    let series_route: MethodRouter<AppState> = if writes_enabled {
        get(api::get_series_quotes)
            .post(api::create_quote)
            .fallback(api::endpoint_not_found)
    } else {
        get(api::get_series_quotes).fallback(api::submission_disabled)
    };

    let bulk_route: MethodRouter<AppState> = if writes_enabled {
        post(api::create_quotes_bulk).fallback(api::endpoint_not_found)
    } else {
        any(api::bulk_submission_disabled)
    };

    let random_route: MethodRouter<AppState> =
        get(api::get_random_quote).fallback(api::endpoint_not_found);

    // Every route carrying a :series segment gets the slug normalized first.
    // Paths match with or without a trailing slash.
    let series_routes = Router::new()
        .route("/quotes/{series}", series_route.clone())
        .route("/quotes/{series}/", series_route)
        .route("/quotes/{series}/random", random_route.clone())
        .route("/quotes/{series}/random/", random_route)
        .route("/quotes/{series}/bulk", bulk_route.clone())
        .route("/quotes/{series}/bulk/", bulk_route)
        .route_layer(middleware::from_fn(api::normalize_series));

    let health_route: MethodRouter<AppState> =
        get(api::health_check).fallback(api::endpoint_not_found);
    let list_route: MethodRouter<AppState> =
        get(api::list_series).fallback(api::endpoint_not_found);

    let api_routes = Router::new()
        .route("/health", health_route.clone())
        .route("/health/", health_route)
        .route("/quotes", list_route.clone())
        .route("/quotes/", list_route)
        .merge(series_routes)
        .fallback(api::endpoint_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Static front-end; unknown paths get the app shell
    let public_dir = &state.config.public_dir;
    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("public, max-age=3600"),
        ))
        .service(ServeDir::new(public_dir).fallback(ServeFile::new(public_dir.join("index.html"))));

    let router = Router::new()
        .nest("/api", api_routes)
        .fallback_service(static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    ratelimit::rate_limit_layer,
                )),
        );

    SECURITY_HEADERS
        .iter()
        .fold(router, |router, &(name, value)| {
            router.layer(SetResponseHeaderLayer::overriding(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ))
        })
        .with_state(state)
}
