use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use donor_locator::auth::JwtVerifier;
use donor_locator::config::{LoggingSettings, Settings};
use donor_locator::routes::{self, AppState};
use donor_locator::services::{CacheManager, PlacesClient, PostgresClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load()
        .map_err(|e| std::io::Error::other(format!("configuration error: {}", e)))?;

    init_tracing(&settings.logging);

    info!("Starting donor locator service...");
    info!("Distance mode: {}", settings.search.distance_mode);

    if settings.auth.jwt_secret.is_empty() {
        return Err(std::io::Error::other("auth.jwt_secret must be set"));
    }
    let auth = Arc::new(JwtVerifier::new(&settings.auth));

    // Cache: Redis is optional, fall back to the in-process tier
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(60);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(url, l1_cache_size, cache_ttl).await {
            Ok(c) => {
                info!("Cache manager initialized (L1: {} entries, Redis, TTL: {}s)", l1_cache_size, cache_ttl);
                c
            }
            Err(e) => {
                warn!("Failed to connect to Redis ({}), using in-process cache only", e);
                CacheManager::in_memory(l1_cache_size, cache_ttl)
            }
        },
        None => {
            info!("No Redis configured, using in-process cache only");
            CacheManager::in_memory(l1_cache_size, cache_ttl)
        }
    };

    let places = match settings.places.api_key.as_deref().filter(|k| !k.is_empty()) {
        Some(key) => {
            let client = PlacesClient::new(
                settings.places.endpoint.clone(),
                key.to_string(),
                Duration::from_secs(settings.places.timeout_secs),
            )
            .map_err(|e| std::io::Error::other(format!("places client error: {}", e)))?;
            info!("Places client initialized");
            Some(Arc::new(client))
        }
        None => {
            info!("No places API key configured, /api/places/* will return 503");
            None
        }
    };

    let db_max_conn = settings.database.max_connections.unwrap_or(10);

    let postgres = PostgresClient::from_settings(
        &settings.database.url,
        Some(db_max_conn),
        settings.database.min_connections,
        settings.database.acquire_timeout_secs,
        settings.database.idle_timeout_secs,
    )
    .await
    .map_err(|e| std::io::Error::other(format!("PostgreSQL connection error: {}", e)))?;

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    let app_state = AppState {
        postgres: Arc::new(postgres),
        cache: Arc::new(cache),
        places,
        auth,
        search: settings.search.clone(),
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .app_data(routes::query_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
