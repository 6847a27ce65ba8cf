use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::auth::CurrentUser;
use crate::auth::{check_chain, Gate};
use crate::error::ApiError;

pub const LOGIN: &[Gate] = &[Gate::RequireLogin];
pub const ADMIN: &[Gate] = &[Gate::RequireAdmin];

/// Runs a route's gate chain before its handler; attach with
/// `middleware::from_fn_with_state(LOGIN, enforce)`
pub async fn enforce(
    State(gates): State<&'static [Gate]>,
    request: Request,
    next: Next,
) -> Response {
    let current = request.extensions().get::<CurrentUser>().cloned().unwrap_or_default();
    match check_chain(gates, current.principal()) {
        Ok(()) => next.run(request).await,
        Err(message) => {
            tracing::debug!("Request to {} rejected: {}", request.uri().path(), message);
            ApiError::forbidden(message).into_response()
        }
    }
}
