// SPDX-License-Identifier: MIT

//! Bearer token middleware (§6): every request needs `Authorization: Bearer
//! <token>` matched against the loaded [`wf_wire::TokenTable`]. Standalone
//! mode and `read_only_mode` don't change auth — a server profile always
//! requires a token file.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use super::AppState;

pub async fn require_bearer_token(
    State(state): State<AppState>,
    header: Option<TypedHeader<Authorization<Bearer>>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(Authorization(bearer))) = header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if state.tokens.authenticate(bearer.token()).is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(request).await)
}
