use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, App, HttpServer};
use tracing_subscriber::EnvFilter;

use groupsplit::auth::TokenSigner;
use groupsplit::config::{Settings, StoreBackend};
use groupsplit::memory_store::MemoryStore;
use groupsplit::mongo_store::MongoStore;
use groupsplit::store::DocumentStore;
use groupsplit::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env().map_err(std::io::Error::other)?;

    let store: Arc<dyn DocumentStore> = match &settings.store {
        StoreBackend::Mongo { uri, database } => {
            tracing::info!("using MongoDB store");
            Arc::new(
                MongoStore::connect(uri, database)
                    .await
                    .map_err(std::io::Error::other)?,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };
    let signer = TokenSigner::new(&settings.auth_secret)
        .map_err(|err| std::io::Error::other(err.to_string()))?;
    let state = AppState::new(store, signer);

    tracing::info!(host = %settings.host, port = settings.port, "server starting");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(|cfg| state.configure(cfg))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run()
    .await
}
