use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use hearth_core::api::v1::{router, ApiState};
use hearth_core::db::init_db;
use hearth_core::provider::GeminiClient;
use hearth_core::session::{SessionStore, SESSION_IDLE_TTL};

fn data_dir() -> PathBuf {
    if let Some(proj) = ProjectDirs::from("org", "Hearth", "Hearth") {
        proj.data_dir().to_path_buf()
    } else {
        std::env::temp_dir().join("Hearth")
    }
}

fn port() -> u16 {
    std::env::var("HEARTH_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8970)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db = init_db(data_dir()).context("failed to init db")?;
    let mut backend = GeminiClient::new().context("failed to initialise provider client")?;
    if let Ok(base_url) = std::env::var("HEARTH_GEMINI_BASE_URL") {
        backend = backend.with_base_url(base_url);
    }
    let state = ApiState {
        db,
        sessions: SessionStore::new(),
        backend: Arc::new(backend),
    };

    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(600));
        loop {
            tick.tick().await;
            let evicted = sessions.evict_idle(SESSION_IDLE_TTL).await;
            if evicted > 0 {
                log::info!("evicted {evicted} idle sessions");
            }
        }
    });

    let addr = format!("127.0.0.1:{}", port());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("Hearth listening on http://{addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
