/// Access-token authentication
///
/// Protected routes run behind [`require_auth`]. It reads the access token
/// from the `access` cookie or a bearer header, validates it without a
/// database round trip, and stores the resulting
/// [`AuthContext`] in the request extensions for handlers to extract with
/// `Extension<AuthContext>`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::middleware::{authenticate_headers, AuthContext};
use tracing::debug;

use crate::{app::AppState, error::ApiError};

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth: AuthContext = authenticate_headers(&state.tokens, req.headers()).map_err(|err| {
        debug!(code = err.code(), path = %req.uri().path(), "Rejected unauthenticated request");
        ApiError::from(err)
    })?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}
