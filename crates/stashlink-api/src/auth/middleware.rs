use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Rejects every request that does not carry a verified session.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    match state.sessions.verify(request.headers()).await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "Session verification failed"
            );
            HttpAppError::from(e).into_response()
        }
    }
}
