use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use englishflow::catalog::Catalog;
use englishflow::config::Settings;
use englishflow::persistence::{FallbackChain, JsonFileCache, SqliteStore};
use englishflow::state::AppState;
use englishflow::{db, handlers};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "englishflow=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let settings = Settings::load();

  let pool = db::init_db(&settings.database_path, settings.persistence_timeout)
    .expect("Failed to initialize database");

  let chain = FallbackChain::new()
    .with_backend(SqliteStore::new(pool))
    .with_backend(JsonFileCache::new(&settings.cache_dir));

  let catalog = Catalog::load_or_builtin(settings.catalog_path.as_deref());
  tracing::info!("Serving {} vocabulary items", catalog.len());

  let app = handlers::router(AppState::new(catalog, chain)).layer(TraceLayer::new_for_http());

  let bind_addr = settings.bind_addr();
  let listener = tokio::net::TcpListener::bind(&bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", bind_addr));

  tracing::info!("Server running on http://localhost:{}", settings.server_port);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
