//! HTTP Basic Authentication for the game API

use crate::config::non_empty_env;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

const DEFAULT_USERNAME: &str = "admin";

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub username: String,
    /// Password for the API (None = auth disabled)
    pub password: Option<String>,
}

impl AuthConfig {
    /// Load from APP_USERNAME (default "admin") and APP_PASSWORD.
    /// Auth is only enabled when a password is set.
    pub fn from_env() -> Self {
        let username = non_empty_env("APP_USERNAME").unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let password = non_empty_env("APP_PASSWORD");

        if password.is_some() {
            tracing::info!("API authentication enabled for user {}", username);
        } else {
            tracing::warn!("API authentication DISABLED - set APP_PASSWORD to protect the game");
        }

        Self { username, password }
    }

    pub fn disabled() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Validate credentials
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match &self.password {
            Some(p) => {
                constant_time_eq(self.username.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            None => true,
        }
    }

    /// Check an `Authorization` header value
    fn accepts(&self, header_value: Option<&str>) -> bool {
        let Some(encoded) = header_value.and_then(|v| v.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        decoded
            .split_once(':')
            .is_some_and(|(user, pass)| self.validate(user, pass))
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware requiring HTTP Basic Auth when enabled
pub async fn basic_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if auth_config.accepts(header_value) {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Friends Game\"")],
        "Unauthorized",
    )
        .into_response()
}
