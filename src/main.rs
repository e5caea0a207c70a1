use axum::Router;
use clap::Parser;
use share_screen::config::{self, AppConfig, Args};
use share_screen::network::lan_ipv4;
use share_screen::session::{MemorySessionStorage, SessionManager, SessionSweeper};
use share_screen::{AppState, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "share_screen=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app_config = match config::load_config_with_fallback(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let session_config = app_config.session_config();
    let storage = Arc::new(MemorySessionStorage::with_token_bytes(
        session_config.token_bytes,
    ));
    let sweeper = SessionSweeper::spawn(storage.clone(), session_config.sweep_interval);
    let sessions = Arc::new(SessionManager::new(storage, session_config));

    let app = build_router(AppState::new(sessions, app_config.stun_server.as_str()));

    tracing::info!(
        "Starting screen share server on {}://{}",
        app_config.scheme(),
        app_config.bind_addr()
    );
    match lan_ipv4() {
        Some(ip) => tracing::info!(
            "Sender page: {}://{}:{}/sender",
            app_config.scheme(),
            ip,
            app_config.port
        ),
        None => tracing::warn!("No LAN address found; viewers must use the host name"),
    }

    let result = if app_config.enable_https {
        serve_https(app, &app_config).await
    } else {
        tracing::warn!("Serving plain HTTP; getDisplayMedia only works on localhost without HTTPS");
        serve_http(app, &app_config).await
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
    }

    sweeper.shutdown().await;
    tracing::info!("Server stopped");
}

async fn serve_http(app: Router, config: &AppConfig) -> std::io::Result<()> {
    let addr = config.bind_addr();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn serve_https(app: Router, config: &AppConfig) -> std::io::Result<()> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
        &config.cert_file,
        &config.key_file,
    )
    .await
    .map_err(|e| {
        tracing::error!(
            "Failed to load TLS certificate '{}' / key '{}': {}",
            config.cert_file.display(),
            config.key_file.display(),
            e
        );
        e
    })?;

    let addr = resolve_addr(&config.bind_addr()).await?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
}

async fn resolve_addr(addr: &str) -> std::io::Result<SocketAddr> {
    tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no address found for {addr}"),
        )
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
