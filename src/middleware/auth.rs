use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::auth::Principal;
use crate::error::ApiError;

/// Outcome of authentication for the current request; `None` is anonymous
#[derive(Clone, Debug, Default)]
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn principal(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

/// Resolves the `Authorization` header once per request and stores the
/// result as a `CurrentUser` extension. Bad credentials are not rejected
/// here; permission gates decide what an anonymous request may do.
pub async fn authentication(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match state.resolver.resolve(header.as_deref()).await {
        Ok(principal) => {
            request.extensions_mut().insert(CurrentUser(principal));
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
