//! services/api/src/bin/api.rs

use billing_portal_core::{
    domain::portal_menu,
    otp::OtpPolicy,
    ports::{MapTokenService, SessionRepository},
    session::SessionManager,
};
use portal_api::{
    adapters::{
        http::build_client, DbAdapter, HttpBackend, HttpIpLookup, HttpMapToken, HttpOtpGateway,
        MemorySessionRepository,
    },
    config::Config,
    error::ApiError,
    web::{
        build_router,
        cookie::SessionSigner,
        maintenance::spawn_maintenance,
        rest::ApiDoc,
        state::{AppState, LoginFlows},
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Session Storage ---
    let repository: Arc<dyn SessionRepository> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL not set; sessions are kept in memory and lost on restart.");
            Arc::new(MemorySessionRepository::new())
        }
    };
    let session_ttl = chrono::Duration::from_std(config.session_ttl)
        .map_err(|e| ApiError::Internal(format!("Invalid session lifetime: {}", e)))?;
    let sessions = Arc::new(SessionManager::new(repository, session_ttl));

    // --- 3. Initialize Upstream Adapters ---
    let http = build_client(config.request_timeout)?;
    let otp_gateway = Arc::new(HttpOtpGateway::new(http.clone(), config.auth_base_url.clone()));
    let ip_lookup = Arc::new(HttpIpLookup::new(http.clone(), config.ip_lookup_url.clone()));
    let backend = Arc::new(HttpBackend::new(http.clone(), config.backend_base_url.clone()));
    let map_token = config.map_token.clone().map(|map_config| {
        Arc::new(HttpMapToken::new(http.clone(), map_config)) as Arc<dyn MapTokenService>
    });
    if map_token.is_none() {
        warn!("Map token credentials not configured; /api/mmi-token will fail.");
    }

    // --- 4. Build the Shared AppState ---
    let login_flows = Arc::new(LoginFlows::new(OtpPolicy {
        resend_cooldown: config.otp_resend_cooldown,
        max_resends: config.otp_max_resends,
    }));
    let app_state = Arc::new(AppState {
        config: config.clone(),
        sessions,
        signer: Arc::new(SessionSigner::new(&config.session_secret)?),
        otp_gateway,
        ip_lookup,
        map_token,
        backend,
        login_flows,
        menu: Arc::new(portal_menu()),
    });

    // --- 5. Background Maintenance & Shutdown Signal ---
    let shutdown = CancellationToken::new();
    let maintenance = spawn_maintenance(app_state.clone(), shutdown.clone());
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received.");
        }
        signal_token.cancel();
    });

    // --- 6. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let api_router = build_router(app_state)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    let server_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_token.cancelled().await })
        .await?;

    shutdown.cancel();
    if let Err(e) = maintenance.await {
        warn!("Maintenance task ended abnormally: {}", e);
    }
    info!("Server stopped.");
    Ok(())
}
