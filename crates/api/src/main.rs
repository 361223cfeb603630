use std::sync::Arc;

use storefront_api::config::ApiConfig;
use storefront_api::dispatch::Services;
use storefront_auth::{InMemorySessionStore, SessionAuthenticator, SessionStore};
use storefront_infra::{Database, LogMailer, MemoryDatabase, MySqlDatabase, SqlSessionStore};

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env();
    storefront_observability::init(config.dev_mode);

    let (db, session_store): (Arc<dyn Database>, Arc<dyn SessionStore>) = match &config.database_url
    {
        Some(url) => {
            let db: Arc<dyn Database> = Arc::new(
                MySqlDatabase::connect(url)
                    .await
                    .expect("failed to connect to database"),
            );
            let store = Arc::new(SqlSessionStore::new(db.clone()));
            (db, store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            (
                Arc::new(MemoryDatabase::new()),
                Arc::new(InMemorySessionStore::new()),
            )
        }
    };

    let bind_address = config.bind_address.clone();
    let services = Arc::new(Services {
        db,
        authenticator: SessionAuthenticator::new(session_store),
        mailer: Arc::new(LogMailer),
        config,
    });

    let app = storefront_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .unwrap_or_else(|_| panic!("failed to bind {bind_address}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
