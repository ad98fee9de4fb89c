use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use council::config;
use council::dispatch::Dispatcher;
use council::documents::DocumentCache;
use council::gemini::{GeminiClient, TextGenerator};
use council::logger::Logger;
use council::registry;
use council::router::{run_router, RouterState};
use council::store::ChatStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = config::load_or_init(Path::new("config.json"))?;

  let logger = Arc::new(Logger::new(Path::new(&config.log_path))?);
  logger.info("AI Council starting up");

  let registry = Arc::new(registry::load_or_init(Path::new(&config.registry_path))?);

  let generator: Option<Arc<dyn TextGenerator>> = match config::api_key() {
    Some(key) => Some(Arc::new(GeminiClient::new(key))),
    None => {
      logger.warn("GEMINI_API_KEY not set; /api/chat will answer 503 until it is configured");
      None
    }
  };

  let documents = Arc::new(DocumentCache::new(PathBuf::from(&config.documents_dir)));
  let dispatcher = Dispatcher::new(registry.clone(), documents, generator, logger.clone());

  let listener = std::net::TcpListener::bind(("127.0.0.1", config.port))?;
  logger.info(&format!("Server running at http://{}", listener.local_addr()?));

  let state = RouterState {
    started_at: Instant::now(),
    registry,
    dispatcher,
    store: ChatStore::new(),
    logger,
  };
  run_router(listener, state, PathBuf::from(&config.public_dir)).await
}
