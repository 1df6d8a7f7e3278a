use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use friendsgame::{
    api, auth,
    config::ServerConfig,
    gateway::GatewayConfig,
    session::GameSession,
    store::{JsonFileStore, MemoryStore},
    types::GameConfig,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "friendsgame=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting friends game...");

    let server_config = ServerConfig::from_env();
    let game_config = GameConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());

    let gateway_config = GatewayConfig::from_env();
    let gateway = Arc::new(gateway_config.build_gateway());
    if gateway_config.preloaded_credentials.is_empty() {
        tracing::info!("No preloaded API keys, players must enter one");
    }

    let pool_store = JsonFileStore::open(&server_config.pool_store_path)
        .await
        .unwrap_or_else(|e| {
            panic!(
                "Failed to open question pool store {}: {}",
                server_config.pool_store_path.display(),
                e
            )
        });
    tracing::info!("Question pools stored in {}", pool_store.path().display());

    let session = GameSession::new(
        game_config,
        gateway,
        Arc::new(pool_store),
        Arc::new(MemoryStore::new()),
    );
    session
        .preload_credentials(&gateway_config.preloaded_credentials)
        .await;
    tracing::info!("Session {} ready", session.id());

    let app = api::router(session, auth_config)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
