//! HTTP surface for PDFGenius.
//!
//! This module exposes an Axum router grouped into three areas:
//!
//! - Accounts: `POST /signup`, `POST /login`, `POST /forgot-password`, `POST /logout`. Account
//!   operations are forwarded to the external authentication service; a successful login opens a
//!   session whose identifier is returned and must be sent back in the `x-session-id` header.
//! - Chat: `POST /chat` answers a question from the indexed documents and records the exchange in
//!   the session's conversation log; `GET /chat` returns that log.
//! - Documents: `GET /documents`, `PUT /documents/:name`, `DELETE /documents/:name`, and
//!   `POST /documents/process` to rebuild the index after the library changed.
//!
//! Sessions end on logout or after `SESSION_IDLE_TIMEOUT_SECS` without a request.
//! `GET /metrics` and `GET /commands` are public. Failure details are logged; clients only see
//! short, generic messages.

use crate::assistant::{AssistantApi, ProcessOutcome};
use crate::auth::{AuthApi, AuthError, ForgotPasswordRequest, LoginRequest, SignupRequest};
use crate::config::Config;
use crate::documents::DocumentError;
use crate::ingestion::IngestionError;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{Answer, AnswerError};
use crate::session::{Exchange, SessionHandle, SessionStore};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Header carrying the session identifier returned by `POST /login`.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared state handed to every handler.
struct AppState<S> {
    service: Arc<S>,
    auth: Arc<dyn AuthApi>,
    sessions: Arc<SessionStore>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            auth: Arc::clone(&self.auth),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

/// Limits applied by the router.
#[derive(Debug, Clone, Copy)]
pub struct RouterSettings {
    /// Largest accepted request body; bigger bodies are rejected with 413.
    pub max_upload_bytes: u64,
    /// Idle period after which a session ends.
    pub session_idle_timeout: Duration,
}

impl From<&Config> for RouterSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            session_idle_timeout: config.session_idle_timeout,
        }
    }
}

/// Build the HTTP router.
pub fn create_router<S>(service: Arc<S>, auth: Arc<dyn AuthApi>, settings: RouterSettings) -> Router
where
    S: AssistantApi + 'static,
{
    let state = AppState {
        service,
        auth,
        sessions: Arc::new(SessionStore::new(settings.session_idle_timeout)),
    };
    let body_limit = usize::try_from(settings.max_upload_bytes).unwrap_or(usize::MAX);

    Router::new()
        .route("/signup", post(signup::<S>))
        .route("/login", post(login::<S>))
        .route("/forgot-password", post(forgot_password::<S>))
        .route("/logout", post(logout::<S>))
        .route("/chat", post(chat::<S>).get(chat_history::<S>))
        .route("/documents", get(list_documents::<S>))
        .route("/documents/process", post(process_documents::<S>))
        .route(
            "/documents/:name",
            put(upload_document::<S>).delete(delete_document::<S>),
        )
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Generic acknowledgement body.
#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Register an account with the authentication service.
async fn signup<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    state.auth.signup(&request).await?;
    tracing::info!(username = %request.username, "Account registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Registered successfully! Please log in.",
        }),
    ))
}

/// Response body for `POST /login`.
#[derive(Serialize)]
struct LoginResponse {
    session_id: Uuid,
    username: String,
}

/// Verify credentials and open a session.
async fn login<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let username = state.auth.login(&request).await?;
    let session_id = state.sessions.create(username.clone()).await;
    tracing::info!(username = %username, "User signed in");
    Ok(Json(LoginResponse {
        session_id,
        username,
    }))
}

/// Ask the authentication service to send a password reset link.
async fn forgot_password<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth.forgot_password(&request).await?;
    Ok(Json(MessageResponse {
        message: "Password reset link sent to your email.",
    }))
}

/// End the session and discard its conversation log.
async fn logout<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let id = session_id(&headers)?;
    if !state.sessions.remove(&id).await {
        return Err(AppError::Unauthorized);
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for `POST /chat`.
#[derive(Deserialize)]
struct ChatRequest {
    query: String,
}

/// Response body for `POST /chat`.
#[derive(Serialize)]
struct ChatResponse {
    /// Display text: `"Answer: <summary>"` or the no-context notice.
    answer: String,
    /// Whether any document content was found for the query.
    context_found: bool,
}

/// Answer a question and record the exchange.
///
/// The session stays locked for the whole turn, so one session's questions are answered one at
/// a time. Failed turns leave the conversation log untouched.
async fn chat<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError>
where
    S: AssistantApi,
{
    let handle = session(&state, &headers).await?;
    let mut session = handle.lock().await;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Query must not be empty."));
    }

    let answer = state.service.answer(query).await?;
    let text = answer.text();
    session.log.append(query, text.clone());
    tracing::debug!(username = %session.username, exchanges = session.log.len(), "Exchange recorded");

    Ok(Json(ChatResponse {
        answer: text,
        context_found: matches!(answer, Answer::Summary(_)),
    }))
}

/// Response body for `GET /chat`.
#[derive(Serialize)]
struct HistoryResponse {
    username: String,
    history: Vec<Exchange>,
}

/// Return the session's conversation log.
async fn chat_history<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, AppError> {
    let handle = session(&state, &headers).await?;
    let session = handle.lock().await;
    Ok(Json(HistoryResponse {
        username: session.username.clone(),
        history: session.log.exchanges().to_vec(),
    }))
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    documents: Vec<String>,
}

/// List uploaded documents.
async fn list_documents<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<DocumentsResponse>, AppError>
where
    S: AssistantApi,
{
    session(&state, &headers).await?;
    let documents = state.service.list_documents().await?;
    Ok(Json(DocumentsResponse { documents }))
}

/// Store the request body as a PDF named `name`.
async fn upload_document<S>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError>
where
    S: AssistantApi,
{
    session(&state, &headers).await?;
    state.service.upload_document(&name, body.to_vec()).await?;
    Ok(StatusCode::CREATED)
}

/// Remove the document named `name`.
async fn delete_document<S>(
    State(state): State<AppState<S>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError>
where
    S: AssistantApi,
{
    session(&state, &headers).await?;
    state.service.delete_document(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rebuild the index if the library changed since the last rebuild.
async fn process_documents<S>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<ProcessOutcome>, AppError>
where
    S: AssistantApi,
{
    session(&state, &headers).await?;
    let outcome = state.service.process_documents().await?;
    Ok(Json(outcome))
}

/// Return query and ingestion counters.
async fn get_metrics<S>(State(state): State<AppState<S>>) -> Json<MetricsSnapshot>
where
    S: AssistantApi,
{
    Json(state.service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    requires_session: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by clients and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "signup",
                method: "POST",
                path: "/signup",
                description: "Create an account. Responds 201 on success.",
                requires_session: false,
                request_example: Some(json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "secret"
                })),
            },
            CommandDescriptor {
                name: "login",
                method: "POST",
                path: "/login",
                description: "Sign in. Returns { \"session_id\", \"username\" }; send the id back in the x-session-id header.",
                requires_session: false,
                request_example: Some(json!({ "username": "alice", "password": "secret" })),
            },
            CommandDescriptor {
                name: "forgot_password",
                method: "POST",
                path: "/forgot-password",
                description: "Request a password reset link.",
                requires_session: false,
                request_example: Some(json!({ "email": "alice@example.com" })),
            },
            CommandDescriptor {
                name: "logout",
                method: "POST",
                path: "/logout",
                description: "End the session and discard its conversation history.",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "chat",
                method: "POST",
                path: "/chat",
                description: "Answer a question by summarizing the most relevant document passages. Returns { \"answer\": string, \"context_found\": bool }.",
                requires_session: true,
                request_example: Some(json!({ "query": "How do plants make energy?" })),
            },
            CommandDescriptor {
                name: "chat_history",
                method: "GET",
                path: "/chat",
                description: "Return the questions and answers of the current session.",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "list_documents",
                method: "GET",
                path: "/documents",
                description: "List uploaded PDF documents.",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "upload_document",
                method: "PUT",
                path: "/documents/:name",
                description: "Upload raw PDF bytes under the given file name. Size and count limits apply.",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "delete_document",
                method: "DELETE",
                path: "/documents/:name",
                description: "Delete a document. The last remaining document cannot be deleted.",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "process_documents",
                method: "POST",
                path: "/documents/process",
                description: "Rebuild the search index when documents changed; otherwise reports \"skipped\".",
                requires_session: true,
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return query and ingestion counters.",
                requires_session: false,
                request_example: None,
            },
        ],
    })
}

fn session_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::Unauthorized)
}

async fn session<S>(state: &AppState<S>, headers: &HeaderMap) -> Result<SessionHandle, AppError> {
    let id = session_id(headers)?;
    state.sessions.get(&id).await.ok_or(AppError::Unauthorized)
}

enum AppError {
    Unauthorized,
    BadRequest(&'static str),
    Answer(AnswerError),
    Document(DocumentError),
    Ingestion(IngestionError),
    Auth(AuthError),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Please log in to continue.".to_string(),
            ),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, (*message).to_string()),
            Self::Answer(error) => {
                let status = match error {
                    AnswerError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.user_message().to_string())
            }
            Self::Document(error) => match error {
                DocumentError::InvalidName(_) | DocumentError::Empty(_) => {
                    (StatusCode::BAD_REQUEST, error.to_string())
                }
                DocumentError::TooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, error.to_string()),
                DocumentError::LimitReached { .. } | DocumentError::LastDocument => {
                    (StatusCode::CONFLICT, error.to_string())
                }
                DocumentError::NotFound(_) => (StatusCode::NOT_FOUND, error.to_string()),
                DocumentError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Document storage failed.".to_string(),
                ),
            },
            Self::Ingestion(error) => match error {
                IngestionError::NoContent { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
                }
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An error occurred while processing documents.".to_string(),
                ),
            },
            Self::Auth(error) => match error {
                AuthError::MissingFields => (StatusCode::BAD_REQUEST, error.to_string()),
                AuthError::Rejected { status, message } => (
                    relayed_status(*status),
                    message.clone(),
                ),
                AuthError::Unavailable(_) => (
                    StatusCode::BAD_GATEWAY,
                    "Authentication service unavailable.".to_string(),
                ),
            },
        }
    }
}

/// Error status reported by the authentication service, or 502 when it answered with anything
/// other than a client or server error.
fn relayed_status(status: u16) -> StatusCode {
    match StatusCode::from_u16(status) {
        Ok(status) if status.is_client_error() || status.is_server_error() => status,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<AnswerError> for AppError {
    fn from(inner: AnswerError) -> Self {
        Self::Answer(inner)
    }
}

impl From<DocumentError> for AppError {
    fn from(inner: DocumentError) -> Self {
        Self::Document(inner)
    }
}

impl From<IngestionError> for AppError {
    fn from(inner: IngestionError) -> Self {
        Self::Ingestion(inner)
    }
}

impl From<AuthError> for AppError {
    fn from(inner: AuthError) -> Self {
        Self::Auth(inner)
    }
}
