use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::ingest::Ingestor;
use crate::models::{
    ChatRequest, ChatResponse, DocumentInfo, MessagesResponse, SessionsResponse, StatusMessage,
    UploadResponse,
};

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub ingestor: Ingestor,
}

pub async fn run_server(config: AppConfig, chat: ChatService, ingestor: Ingestor) -> Result<()> {
    let app = build_router(&config, AppState { chat, ingestor })?;

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.bind_addr))?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(config: &AppConfig, state: AppState) -> Result<Router> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat_handler))
        .route("/upload", post(upload_handler))
        .route("/sessions", get(list_sessions).delete(clear_sessions))
        .route("/session/:session_id", get(get_session).delete(delete_session))
        .route(
            "/document/:session_id",
            get(get_document).delete(delete_document),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// Exact-origin CORS with credentials. Methods and headers mirror the
/// preflight request, since wildcards cannot be combined with credentials.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.chat.answer(request).await?;
    Ok(Json(response))
}

async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_multipart)?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("session_id") => {
                session_id = Some(field.text().await.map_err(invalid_multipart)?);
            }
            _ => {}
        }
    }

    tracing::info!(
        session_id = session_id.as_deref().unwrap_or(""),
        "received upload request"
    );

    let Some((filename, bytes)) = file else {
        return Err(AppError::Validation("No file uploaded".to_string()));
    };
    let Some(session_id) = session_id.filter(|id| !id.is_empty()) else {
        return Err(AppError::Validation("No session ID provided".to_string()));
    };

    let response = state.ingestor.ingest(&session_id, filename, bytes).await?;
    Ok(Json(response))
}

fn invalid_multipart(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("upload too large: {err}"))
    } else {
        AppError::Validation(format!("invalid multipart body: {err}"))
    }
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.chat.session_ids(),
    })
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = state.chat.history(&session_id)?;
    Ok(Json(MessagesResponse { messages }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusMessage>, AppError> {
    state.chat.delete_session(&session_id).await?;
    Ok(Json(StatusMessage::new(format!(
        "Session {session_id} deleted successfully"
    ))))
}

async fn clear_sessions(State(state): State<AppState>) -> Json<StatusMessage> {
    state.chat.clear_sessions();
    Json(StatusMessage::new("All chat sessions cleared"))
}

async fn get_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DocumentInfo>, AppError> {
    Ok(Json(state.ingestor.document_info(&session_id)?))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<StatusMessage>, AppError> {
    state.ingestor.delete_document(&session_id)?;
    Ok(Json(StatusMessage::new(format!(
        "Document for session {session_id} deleted successfully"
    ))))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
