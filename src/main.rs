use scene_sync::config::Config;
use scene_sync::db::{self, memdb::MemoryEngine, FileStore};
use scene_sync::routes::{create_http_app, create_ws_routes};
use scene_sync::AppState;

use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration first so it can pick the log level
    let loaded = Config::load();
    let log_filter = match &loaded {
        Ok(config) => config.log_filter(),
        Err(_) => Config::default().log_filter(),
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .init();

    info!("Starting server...");

    let config = match loaded {
        Ok(config) => {
            info!("✅ Configuration loaded ({} environment)", config.environment);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            warn!("Using default configuration");
            Config::default()
        }
    };

    // Initialize the storage engine
    let engine = match db::init_engine(&config).await {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            warn!("Falling back to in-memory storage - scene state will not survive a restart");
            Arc::new(MemoryEngine::new(FileStore::new(&config.files_dir)))
        }
    };

    let state = AppState::new(engine, &config);
    if config.seed_demo_objects {
        state.coordinator.seed_demo_objects().await;
    }

    let http_app = create_http_app(state.clone(), &config);
    let ws_app = create_ws_routes(state);

    // Start WebSocket server
    let ws_addr = config.websocket_address();
    let ws_listener = match tokio::net::TcpListener::bind(&ws_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind WebSocket server to {}: {}", ws_addr, e);
            std::process::exit(1);
        }
    };
    info!("📡 WebSocket server starting on ws://{}", ws_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(ws_listener, ws_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("WebSocket server error: {}", e);
        }
    });

    // Start the HTTP/API server
    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, http_app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
