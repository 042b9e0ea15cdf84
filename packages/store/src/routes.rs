//! HTTP surface of the reference store

use crate::store::MemoryStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use classdraft_common::{DocumentId, DocumentKind, DocumentRecord, HistoryEntry, HistoryEntryId, SaveRequest};
use classdraft_editor::{PersistenceClient, PersistenceError};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// A [`PersistenceError`] rendered as `{ "error": message }`
#[derive(Debug)]
pub struct ApiError(pub PersistenceError);

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            PersistenceError::NotFound(_) => StatusCode::NOT_FOUND,
            PersistenceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PersistenceError::Locked(_) => StatusCode::CONFLICT,
            PersistenceError::StaleReference { .. } => StatusCode::GONE,
            PersistenceError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status(), &self.0.to_string()).into_response()
    }
}

fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({ "error": message })))
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct CreateDocument {
    pub id: DocumentId,
    pub kind: DocumentKind,
}

#[derive(Debug, Deserialize)]
pub struct RestoreBody {
    pub history_entry_id: HistoryEntryId,
}

/// Build the router over a shared store
pub fn router(store: Arc<MemoryStore>) -> Router {
    Router::new()
        .route("/documents", post(create_document))
        .route("/documents/:id", get(load_document))
        .route("/documents/:id/content", put(save_content))
        .route("/documents/:id/submit", post(submit_document))
        .route("/documents/:id/unsubmit", post(unsubmit_document))
        .route("/documents/:id/history", get(list_history))
        .route("/documents/:id/restore", post(restore_entry))
        .route("/documents/:id/grade", post(grade_document))
        .route("/documents/:id/return", post(return_document))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

/// Serve the router until Ctrl+C
pub async fn serve(store: Arc<MemoryStore>, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "store listening");
    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

async fn create_document(
    State(store): State<Arc<MemoryStore>>,
    Json(body): Json<CreateDocument>,
) -> Result<(StatusCode, Json<DocumentRecord>), ApiError> {
    let record = store.create_document(body.id, body.kind).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn load_document(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.load(&id).await?))
}

async fn save_content(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.save(&id, request).await?))
}

async fn submit_document(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.submit(&id).await?))
}

async fn unsubmit_document(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.unsubmit(&id).await?))
}

async fn list_history(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<Vec<HistoryEntry>> {
    Ok(Json(store.list_history(&id).await?))
}

async fn restore_entry(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
    Json(body): Json<RestoreBody>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.restore(&id, body.history_entry_id).await?))
}

async fn grade_document(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.grade(&id).await?))
}

async fn return_document(
    State(store): State<Arc<MemoryStore>>,
    Path(id): Path<DocumentId>,
) -> ApiResult<DocumentRecord> {
    Ok(Json(store.return_to_student(&id).await?))
}
