//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AddNotificationRequest, CheckInResponse, ConversationListResponse, ConversationResponse,
    ErrorResponse, ListConversationsQuery, MarkReadResponse, MessageResponse,
    NotificationListResponse, NotificationResponse, NotificationUpdateResponse,
    SendMessageRequest, SuccessResponse,
};
use super::{AppState, ACTOR_HEADER};
use crate::chat::{ChatError, ErrorKind};
use crate::notifications::{
    AlertBroadcast, CheckInReport, FeedError, NotificationPayload, SourceError,
};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Conversations
        .route("/api/conversations", get(list_conversations))
        .route("/api/conversations/stream", get(stream_conversations))
        .route(
            "/api/conversations/:id",
            get(get_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/:id/messages", post(send_message))
        .route("/api/conversations/:id/read", post(mark_conversation_read))
        // Notification feed
        .route(
            "/api/notifications",
            get(list_notifications).post(add_notification),
        )
        .route("/api/notifications/stream", get(stream_notifications))
        .route("/api/notifications/read-all", post(mark_all_notifications_read))
        .route(
            "/api/notifications/:id",
            get(get_notification).delete(clear_notification),
        )
        .route("/api/notifications/:id/read", post(mark_notification_read))
        // Community sources
        .route("/api/check-ins", post(submit_check_in))
        .route("/api/alerts", post(broadcast_alert))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ListConversationsQuery>,
) -> Json<ConversationListResponse> {
    let store = state.app.store();
    Json(ConversationListResponse {
        conversations: store.summaries(query.q.as_deref()),
        total_unread: store.total_unread(),
    })
}

async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let conversation = state.app.store().select_conversation(&id)?;
    Ok(Json(ConversationResponse {
        unread_count: conversation.unread_count(),
        conversation,
    }))
}

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let actor = actor_id(&headers)?;
    let message = state.app.store().send_message(&id, &actor, &req.content)?;
    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}

async fn mark_conversation_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let store = state.app.store();
    let marked = store.mark_conversation_read(&id)?;
    Ok(Json(MarkReadResponse {
        marked,
        unread_count: store.unread_count(&id).unwrap_or(0),
    }))
}

async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SuccessResponse> {
    let removed = state.app.store().remove_conversation(&id);
    Json(SuccessResponse { success: removed })
}

async fn stream_conversations(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.app.store();
    // Subscribe before taking the snapshot so nothing falls in between
    let rx = store.subscribe();
    let init = json!({
        "type": "init",
        "conversations": store.summaries(None),
        "total_unread": store.total_unread(),
    });
    sse_stream(init, rx, state.app.shutdown_token())
}

// ============================================================
// Notification Feed
// ============================================================

async fn list_notifications(State(state): State<AppState>) -> Json<NotificationListResponse> {
    let feed = state.app.feed();
    Json(NotificationListResponse {
        notifications: feed.list(),
        unread_count: feed.unread_count(),
    })
}

async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, AppError> {
    let feed = state.app.feed();
    let notification = feed.get(&id)?;
    Ok(Json(NotificationResponse {
        notification,
        unread_count: feed.unread_count(),
    }))
}

async fn add_notification(
    State(state): State<AppState>,
    Json(req): Json<AddNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), AppError> {
    if req.category.trim().is_empty() {
        return Err(AppError::BadRequest("category must not be blank".to_string()));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be blank".to_string()));
    }

    let mut payload = NotificationPayload::new(req.title, req.body).with_data(req.data);
    payload.target = req.target;

    let feed = state.app.feed();
    let notification = feed.add_notification(req.category.trim(), payload);
    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse {
            notification,
            unread_count: feed.unread_count(),
        }),
    ))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<NotificationUpdateResponse> {
    let feed = state.app.feed();
    let changed = feed.mark_as_read(&id);
    Json(NotificationUpdateResponse {
        changed,
        unread_count: feed.unread_count(),
    })
}

async fn mark_all_notifications_read(State(state): State<AppState>) -> Json<MarkReadResponse> {
    let feed = state.app.feed();
    let marked = feed.mark_all_as_read();
    Json(MarkReadResponse {
        marked,
        unread_count: feed.unread_count(),
    })
}

async fn clear_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<NotificationUpdateResponse> {
    let feed = state.app.feed();
    let changed = feed.clear_notification(&id);
    Json(NotificationUpdateResponse {
        changed,
        unread_count: feed.unread_count(),
    })
}

async fn stream_notifications(State(state): State<AppState>) -> impl IntoResponse {
    let feed = state.app.feed();
    let rx = feed.subscribe();
    let init = json!({
        "type": "init",
        "notifications": feed.list(),
        "unread_count": feed.unread_count(),
    });
    sse_stream(init, rx, state.app.shutdown_token())
}

// ============================================================
// Community Sources
// ============================================================

async fn submit_check_in(
    State(state): State<AppState>,
    Json(report): Json<CheckInReport>,
) -> Result<Json<CheckInResponse>, AppError> {
    let notification = state.app.feed().record_check_in(&report)?;
    Ok(Json(CheckInResponse {
        flagged: notification.is_some(),
        notification,
    }))
}

async fn broadcast_alert(
    State(state): State<AppState>,
    Json(alert): Json<AlertBroadcast>,
) -> Result<(StatusCode, Json<NotificationResponse>), AppError> {
    let feed = state.app.feed();
    let notification = feed.broadcast_alert(&alert)?;
    Ok((
        StatusCode::CREATED,
        Json(NotificationResponse {
            notification,
            unread_count: feed.unread_count(),
        }),
    ))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("safezone-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Actor Identity
// ============================================================

/// Caller-supplied actor id. Not authenticated.
fn actor_id(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::BadRequest(format!("missing {ACTOR_HEADER} header")))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err.kind() {
            ErrorKind::Validation => AppError::BadRequest(err.to_string()),
            ErrorKind::NotFound => AppError::NotFound(err.to_string()),
        }
    }
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::NotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
