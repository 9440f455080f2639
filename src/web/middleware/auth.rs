//! Owner authentication.
//!
//! Owners present an HS256 bearer token issued by an external identity
//! service. Only verification happens here; the `sub` claim is the owner id.

use axum::{
    async_trait,
    body::Body,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::web::error::ApiError;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (owner ID).
    pub sub: String,
    /// Issued at timestamp.
    #[serde(default)]
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
}

/// Verification state for owner tokens.
#[derive(Clone)]
pub struct JwtState {
    /// Decoding key for JWT verification.
    pub decoding_key: DecodingKey,
    /// Validation settings.
    pub validation: Validation,
}

impl JwtState {
    /// Create a new JWT state from a secret key.
    pub fn new(secret: &str) -> Self {
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key,
            validation,
        }
    }
}

/// Find the bearer token in the Authorization header, or in a `token`
/// query parameter for plain browser downloads.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(auth_header) = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        return auth_header.strip_prefix("Bearer ").map(|t| t.trim().to_string());
    }

    parts.uri.query().unwrap_or("").split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "token" {
            urlencoding::decode(value).ok().map(|s| s.into_owned())
        } else {
            None
        }
    })
}

/// Extractor for authenticated owners.
#[derive(Debug, Clone)]
pub struct AuthUser(pub JwtClaims);

impl AuthUser {
    /// Owner ID of the authenticated caller.
    pub fn owner_id(&self) -> &str {
        &self.0.sub
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token =
            extract_token(parts).ok_or_else(|| ApiError::unauthorized("Missing authorization"))?;

        // Set by the jwt_auth middleware
        let jwt_state = parts
            .extensions
            .get::<Arc<JwtState>>()
            .ok_or_else(|| ApiError::internal("JWT state not configured"))?;

        let token_data =
            decode::<JwtClaims>(&token, &jwt_state.decoding_key, &jwt_state.validation).map_err(
                |e| {
                    tracing::debug!("JWT validation failed: {}", e);
                    ApiError::unauthorized("Invalid or expired token")
                },
            )?;

        if token_data.claims.sub.trim().is_empty() {
            return Err(ApiError::unauthorized("Token has no subject"));
        }

        Ok(AuthUser(token_data.claims))
    }
}

/// Middleware function to inject JWT state into request extensions.
pub async fn jwt_auth(
    jwt_state: Arc<JwtState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    request.extensions_mut().insert(jwt_state);
    next.run(request).await
}
