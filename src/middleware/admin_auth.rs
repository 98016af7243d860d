//! HTTP basic auth for the `/admin` path.
//!
//! Credentials come from `ADMIN_USER` / `ADMIN_PASS`. If either is unset the
//! path stays closed instead of open.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::AppState;

pub async fn basic_auth(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let (Some(user), Some(pass)) = (
        state.config.admin_user.as_deref(),
        state.config.admin_pass.as_deref(),
    ) else {
        tracing::warn!("admin path requested but ADMIN_USER/ADMIN_PASS are not set");
        return unauthorized();
    };

    let provided = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(decode_credentials);

    match provided {
        Some((u, p)) if credentials_match(&u, &p, user, pass) => next.run(req).await,
        Some((u, _)) => {
            tracing::warn!(user = %u, "admin path: invalid credentials");
            unauthorized()
        }
        None => unauthorized(),
    }
}

/// Decode `base64(user:pass)`. The password may itself contain `:`.
fn decode_credentials(encoded: &str) -> Option<(String, String)> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let (user, pass) = text.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

fn credentials_match(user: &str, pass: &str, expected_user: &str, expected_pass: &str) -> bool {
    let user_ok = user.as_bytes().ct_eq(expected_user.as_bytes());
    let pass_ok = pass.as_bytes().ct_eq(expected_pass.as_bytes());
    bool::from(user_ok & pass_ok)
}

fn unauthorized() -> Response {
    let mut resp = (StatusCode::UNAUTHORIZED, "Auth required").into_response();
    resp.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"Admin\""),
    );
    resp
}
