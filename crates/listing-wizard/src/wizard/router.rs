use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::Value;

use super::draft::ContactInfo;
use super::session::{JumpTarget, SessionError, SessionId, SessionRegistry};
use super::submission::SubmissionOutcome;
use crate::error::AppError;

/// Router builder exposing the wizard surface: draft updates, navigation, submission.
pub fn wizard_router(registry: Arc<SessionRegistry>) -> Router {
    Router::new()
        .route("/api/v1/wizard/sessions", post(create_handler))
        .route(
            "/api/v1/wizard/sessions/:session_id",
            get(view_handler).delete(delete_handler),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/draft",
            patch(update_draft_handler),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/draft/undo",
            post(undo_draft_handler),
        )
        .route("/api/v1/wizard/sessions/:session_id/next", post(next_handler))
        .route("/api/v1/wizard/sessions/:session_id/prev", post(prev_handler))
        .route("/api/v1/wizard/sessions/:session_id/jump", post(jump_handler))
        .route(
            "/api/v1/wizard/sessions/:session_id/submit",
            post(submit_handler),
        )
        .route(
            "/api/v1/wizard/sessions/:session_id/restart",
            post(restart_handler),
        )
        .with_state(registry)
}

pub(crate) async fn create_handler(State(registry): State<Arc<SessionRegistry>>) -> Response {
    let session = registry.create();
    (StatusCode::CREATED, Json(session.view())).into_response()
}

pub(crate) async fn view_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    match registry.get(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, Json(session.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    match registry.remove(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_draft_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
    Json(partial): Json<Value>,
) -> Response {
    let result = registry
        .get(&SessionId(session_id))
        .and_then(|session| session.update_draft(&partial));
    match result {
        Ok(draft) => (StatusCode::OK, Json(draft.as_ref().clone())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn undo_draft_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    let result = registry
        .get(&SessionId(session_id))
        .and_then(|session| session.undo_draft());
    match result {
        Ok(draft) => (StatusCode::OK, Json(draft.as_ref().clone())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn next_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    match registry.get(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, Json(session.next())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn prev_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    match registry.get(&SessionId(session_id)) {
        Ok(session) => (StatusCode::OK, Json(session.prev())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn jump_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
    Json(target): Json<JumpTarget>,
) -> Response {
    let result = registry
        .get(&SessionId(session_id))
        .and_then(|session| session.jump(target));
    match result {
        Ok(position) => (StatusCode::OK, Json(position)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
    Json(contact): Json<ContactInfo>,
) -> Response {
    let session = match registry.get(&SessionId(session_id)) {
        Ok(session) => session,
        Err(err) => return error_response(err),
    };

    match session.submit(&contact).await {
        Ok(record) => {
            let status = match record.outcome {
                SubmissionOutcome::Success { .. } => StatusCode::OK,
                SubmissionOutcome::BusinessError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SubmissionOutcome::TransportError { .. } => StatusCode::BAD_GATEWAY,
            };
            (status, Json(record)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn restart_handler(
    State(registry): State<Arc<SessionRegistry>>,
    Path(session_id): Path<String>,
) -> Response {
    let result = registry
        .get(&SessionId(session_id))
        .and_then(|session| session.restart());
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(error: SessionError) -> Response {
    AppError::from(error).into_response()
}
