//! Principal resolution for every API route

use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use carbonserver_common::errors::Result;

/// Resolve the caller and attach the `Principal` to the request
pub async fn authenticate(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response> {
    let principal = state.auth.authenticate(request.headers()).await?;
    tracing::debug!(principal = principal.kind(), "Request authenticated");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
