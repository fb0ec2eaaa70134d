//! Bearer API-key identification.
//!
//! Keys come from the configuration and name a login; the login is resolved
//! to the user identifier through the user store on every request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

use super::{error::ApiError, AppState};
use crate::config::ApiKeyEntry;
use crate::db::StorageError;

/// Authenticated user info, added to request extensions after auth
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub login: String,
}

/// API key store - maps key -> login
#[derive(Debug, Clone, Default)]
pub struct ApiKeyStore {
    keys: HashMap<String, String>,
}

impl ApiKeyStore {
    pub fn new(entries: &[ApiKeyEntry]) -> Self {
        let keys: HashMap<String, String> = entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.login.clone()))
            .collect();
        if keys.is_empty() {
            tracing::warn!("No API keys loaded - all authenticated requests will fail");
        } else {
            tracing::info!("Loaded {} API key(s)", keys.len());
        }
        Self { keys }
    }

    /// Returns the login the key belongs to.
    pub fn login_for(&self, key: &str) -> Option<&str> {
        self.keys.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let api_key = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(key) => key,
            None => {
                return ApiError::Unauthorized {
                    error: "invalid_auth",
                    message: "Authorization header must use Bearer scheme",
                }
                .into_response();
            }
        },
        None => {
            return ApiError::Unauthorized {
                error: "missing_auth",
                message: "Authorization header required",
            }
            .into_response();
        }
    };

    let invalid_key = ApiError::Unauthorized {
        error: "invalid_key",
        message: "Invalid API key",
    };

    let Some(login) = state.api_keys.login_for(api_key) else {
        return invalid_key.into_response();
    };

    match state.storage.users().get_user_id(login).await {
        Ok(user_id) => {
            request.extensions_mut().insert(AuthUser {
                user_id,
                login: login.to_string(),
            });
            next.run(request).await
        }
        Err(StorageError::NotFound) => {
            tracing::warn!("API key refers to unknown login {:?}", login);
            invalid_key.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
