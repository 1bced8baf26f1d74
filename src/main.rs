use mood_journal::debounce::Debouncer;
use mood_journal::draft::{DRAFT_STORAGE_KEY, DraftStore};
use mood_journal::kv::FileStorage;
use mood_journal::{AppConfig, AppState, load_data, router};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env();
    if let Some(parent) = config.data_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let data = load_data(&config.data_path).await;
    info!("loaded {} entries from {}", data.entries.len(), config.data_path.display());

    let draft = DraftStore::open(
        Arc::new(FileStorage::new(config.draft_dir.clone())),
        DRAFT_STORAGE_KEY,
    );
    let debouncer = Debouncer::new(config.draft_debounce);
    info!("draft edits debounced by {:?}", debouncer.delay());

    let state = AppState::new(config.data_path.clone(), data, draft, debouncer);
    let debouncer = Arc::clone(&state.debouncer);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let cancelled = debouncer.cancel_all().await;
    if cancelled > 0 {
        info!("dropped {cancelled} pending draft edits on shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
