use shake_logger::{load_settings, resolve_config_path, router, AppState};
use std::{env, net::SocketAddr};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config_path = resolve_config_path();
    let settings = load_settings(&config_path).await?;
    info!(
        path = %config_path.display(),
        delta_threshold = settings.detector.delta_threshold,
        sample_min_interval_ms = settings.detector.sample_min_interval_ms,
        required_consecutive_shakes = settings.detector.required_consecutive_shakes,
        min_episode_duration_ms = settings.detector.min_episode_duration_ms,
        cooldown_ms = settings.detector.cooldown_ms,
        session_ttl_ms = settings.session_ttl_ms,
        max_sessions = settings.max_sessions,
        "detector settings loaded"
    );

    let state = AppState::new(settings)?;
    let app = router(state);

    let port = env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
