use std::path::Path;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use notehub_api::{router, shutdown_on, AppState, ServerConfig};
use notehub_store::Store;

const DEFAULT_LOG_FILTER: &str = "notehub_api=debug,notehub_service=debug,tower_http=debug";

/// Install the global subscriber.
///
/// - `LOG_FORMAT`: `json` or `text` (default)
/// - `LOG_FILE`: write to a daily-rotated file instead of stdout
/// - `LOG_ANSI`: force colors on or off; files default to off
/// - `RUST_LOG`: filter directives
///
/// The returned guard flushes the file writer and must outlive the server.
fn init_tracing() -> Option<WorkerGuard> {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");
    let log_file = std::env::var("LOG_FILE").ok();
    let ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1")
        .unwrap_or(log_file.is_none());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (writer, guard) = match log_file.as_deref() {
        Some(path) => {
            let path = Path::new(path);
            let dir = path.parent().unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("notehub-api.log");
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, name));
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi);
    let subscriber = tracing_subscriber::registry().with(filter);
    if json {
        subscriber.with(fmt.json()).init();
    } else {
        subscriber.with(fmt).init();
    }

    info!(
        log_format = if json { "json" } else { "text" },
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    guard
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn termination() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = init_tracing();

    let config = ServerConfig::from_env();
    let addr = config.socket_addr()?;
    info!(
        subscriber_buffer = config.subscriber_buffer,
        ws_ping_interval_secs = config.ws_ping_interval.as_secs(),
        "Configuration loaded"
    );

    let store = Store::new();
    let state = AppState::new(&store, &config);
    let registry = state.registry().clone();
    let app = router(state, &config);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(termination(), registry))
        .await?;

    info!("Server stopped");
    Ok(())
}
