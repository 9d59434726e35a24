use std::net::SocketAddr;
use std::sync::Arc;

use common::storage::filesystem::FilesystemByteStore;
use tracing::{Level, info};

use server::config::AppConfig;
use server::state::AppState;
use server::{database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load()?;

    let db = database::init_db(&config.database.url).await?;
    seed::seed_bootstrap_admin(&db, &config).await?;

    let blob_store =
        FilesystemByteStore::new(config.storage.root.clone(), config.storage.max_blob_size)
            .await?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let state = AppState {
        db,
        blob_store: Arc::new(blob_store),
        config,
    };
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
