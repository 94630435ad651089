use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::{ApiError, AppState};

/// Gate for staff routes. On success the resolved [`crate::entity::User`] is
/// placed in the request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let now = state.service.now();
    let user = {
        let store = state.service.store().lock().await;
        state
            .tokens
            .authenticate(authorization.as_deref(), &store, now)?
    };

    tracing::debug!(user = %user.email, path = %req.uri().path(), "admin request");
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
