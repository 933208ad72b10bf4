use literary_hall::{
    config::Config,
    routes,
    services::auth::AuthEvent,
    state::{backend_from_config, AppState},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("LOG_LEVEL").unwrap_or_else(|_| "literary_hall=debug,tower_http=debug".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting literary-hall service...");

    let config = Config::from_env()?;
    info!("Environment: {}, backend mode: {:?}", config.environment, config.backend_mode);

    let backend = backend_from_config(&config)?;
    let app_state = Arc::new(AppState::new(config.clone(), backend).await?);

    if let Err(e) = app_state.db.verify_connection().await {
        error!("Backend connection failed: {}", e);
        return Err(anyhow::anyhow!("Backend connection failed"));
    }

    if config.seed_sample_data {
        match app_state.work_service.seed_sample_works().await {
            Ok(0) => info!("Sample works already present, skipping seed"),
            Ok(n) => info!("Seeded {} sample works", n),
            Err(e) => warn!("Failed to seed sample works: {}", e),
        }
    }

    let subscription = app_state.auth_service.on_auth_state_change(|event| match event {
        AuthEvent::SignedIn { user_id } => info!("Session started for {}", user_id),
        AuthEvent::SignedOut { user_id } => info!("Session ended for {}", user_id),
    });

    let app = routes::app(app_state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.auth_service.unsubscribe(subscription);
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
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
