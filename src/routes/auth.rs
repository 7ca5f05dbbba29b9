use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me))
        .route("/login", get(login))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Identity issued by the external auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    redirect: Option<String>,
}

/// Claims of the tokens issued by the auth service. Tokens are only ever
/// decoded here, never minted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

fn default_role() -> String {
    "user".to_string()
}

// ============================================================================
// Handlers
// ============================================================================

/// Identity of the caller. Does not touch the stock user table.
async fn me(AuthUser(user): AuthUser) -> Json<AuthIdentity> {
    Json(user)
}

/// Send the browser to the auth service login page.
async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
) -> impl IntoResponse {
    let redirect = query.redirect.filter(|r| !r.is_empty());
    Redirect::to(&login_url(
        &state.config.auth.service_url,
        redirect.as_deref(),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// `{auth_service_url}/login`, with `?redirect=` when a return URL is given.
pub fn login_url(auth_service_url: &str, redirect: Option<&str>) -> String {
    let base = format!("{}/login", auth_service_url.trim_end_matches('/'));
    match redirect {
        Some(r) => format!("{}?redirect={}", base, urlencoding::encode(r)),
        None => base,
    }
}

/// Decode and validate a JWT, returning the claims
fn decode_jwt(secret: &str, token: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Token from the auth cookie, falling back to `Authorization: Bearer`.
fn token_from_parts(parts: &Parts, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    let auth_header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    if !auth_header.to_ascii_lowercase().starts_with("bearer ") {
        tracing::debug!("Authorization header doesn't start with 'Bearer '");
        return None;
    }

    let token = auth_header[7..].trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

// ============================================================================
// Auth Extractor
// ============================================================================

/// Extractor for the authenticated caller
pub struct AuthUser(pub AuthIdentity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts, &state.config.auth.cookie_name).ok_or_else(|| {
            tracing::debug!("No auth cookie or bearer token on request");
            AppError::Unauthorized
        })?;

        let claims = decode_jwt(&state.config.auth.jwt_secret, &token)?;

        tracing::debug!("Authenticated auth user: {}", claims.user_id);
        Ok(AuthUser(AuthIdentity {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }))
    }
}
