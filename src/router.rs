use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::dispatch::Dispatcher;
use crate::error::ApiError;
use crate::logger::Logger;
use crate::models::{ChatRequest, MemberResult, SaveChatRequest};
use crate::registry::MemberRegistry;
use crate::store::ChatStore;

pub struct RouterState {
  pub started_at: Instant,
  pub registry: Arc<MemberRegistry>,
  pub dispatcher: Dispatcher,
  pub store: ChatStore,
  pub logger: Arc<Logger>,
}

pub async fn run_router(
  listener: TcpListener,
  state: RouterState,
  public_dir: PathBuf,
) -> anyhow::Result<()> {
  let app = Router::new()
    .route("/health", get(health))
    .route("/api/gems", get(gems))
    .route("/api/chat", post(chat))
    .route("/api/chats", post(save_chat).get(list_chats))
    .route("/api/chats/:id", get(get_chat))
    .fallback_service(ServeDir::new(public_dir))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state));

  let listener = tokio::net::TcpListener::from_std(listener)?;
  axum::serve(listener, app).await?;
  Ok(())
}

async fn health(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  let uptime = state.started_at.elapsed().as_millis();
  Json(serde_json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
    "uptime_ms": uptime
  }))
}

async fn gems(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  Json(serde_json::json!({ "members": state.registry.cards() }))
}

async fn chat(
  State(state): State<Arc<RouterState>>,
  Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
  match state.dispatcher.dispatch(&req).await {
    Ok(results) => {
      state.logger.info(&format!("Dispatched to {} member(s)", results.len()));
      (StatusCode::OK, Json(serde_json::json!({ "results": results }))).into_response()
    }
    Err(err) => error_response(err.status(), &err.to_string()),
  }
}

async fn save_chat(
  State(state): State<Arc<RouterState>>,
  Json(req): Json<SaveChatRequest>,
) -> impl IntoResponse {
  let (prompt, selected, results) = match validate_save(req) {
    Ok(fields) => fields,
    Err(err) => return error_response(err.status(), &err.to_string()),
  };
  let (id, created_at) = state
    .store
    .save(&state.registry, prompt, selected, results)
    .await;
  (
    StatusCode::OK,
    Json(serde_json::json!({ "id": id, "createdAt": created_at })),
  )
    .into_response()
}

async fn list_chats(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  Json(serde_json::json!({ "chats": state.store.list().await }))
}

async fn get_chat(
  State(state): State<Arc<RouterState>>,
  Path(id): Path<String>,
) -> Response {
  match state.store.get(&id).await {
    Some(chat) => (StatusCode::OK, Json(chat)).into_response(),
    None => error_response(StatusCode::NOT_FOUND, "Chat not found."),
  }
}

fn error_response(status: StatusCode, message: &str) -> Response {
  let body = Json(serde_json::json!({ "error": message }));
  (status, body).into_response()
}

type SaveFields = (String, Vec<u16>, Vec<MemberResult>);

fn validate_save(req: SaveChatRequest) -> Result<SaveFields, ApiError> {
  let prompt = req.prompt.unwrap_or_default();
  let Some(results) = req.results else {
    return Err(ApiError::Validation("prompt and results required.".to_string()));
  };
  if prompt.is_empty() {
    return Err(ApiError::Validation("prompt and results required.".to_string()));
  }
  Ok((prompt, req.selected_gems, results))
}
