//! Authentication extractors.
//!
//! - [`BearerToken`]: the raw `Authorization: Bearer <token>` value
//! - [`AuthUser`]: a verified token; use it to require any signed-in user
//! - [`RequireAdmin`]: a verified token carrying the admin role
//!
//! # Usage
//!
//! ```rust,ignore
//! async fn list_users(
//!     _admin: RequireAdmin,
//!     State(state): State<AppState>,
//! ) -> WebResult<Json<UsersResponse>> {
//!     ...
//! }
//! ```

use super::token::TokenKeys;
use crate::aggregates::Requester;
use crate::types::{UserId, UserRole};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use boothbook_web::{AppError, WebResult};
use std::sync::Arc;

/// Bearer token extracted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Self(token.to_string()))
            .ok_or_else(|| AppError::unauthorized("Access token required"))
    }
}

/// The signed-in user, as asserted by a valid token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Account id
    pub user_id: UserId,
    /// Email at token issue time
    pub email: String,
    /// Role at token issue time
    pub role: UserRole,
}

impl AuthUser {
    /// Whether the token carries the admin role
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// The requester passed to ledger commands
    #[must_use]
    pub fn requester(&self) -> Requester {
        Requester {
            user_id: self.user_id,
            is_admin: self.is_admin(),
        }
    }

    /// Allow the owner of a resource, or an administrator
    ///
    /// # Errors
    ///
    /// Returns 403 with `message` for anyone else.
    pub fn ensure_owner_or_admin(&self, owner: UserId, message: &str) -> WebResult<()> {
        if self.is_admin() || self.user_id == owner {
            Ok(())
        } else {
            Err(AppError::forbidden(message))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let keys = Arc::<TokenKeys>::from_ref(state);

        let claims = keys.verify(&token).map_err(|error| {
            tracing::debug!(error = %error, "Rejected bearer token");
            AppError::forbidden("Invalid token")
        })?;

        Ok(Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// A signed-in administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    Arc<TokenKeys>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            tracing::debug!(user_id = %user.user_id, "Admin route refused");
            return Err(AppError::forbidden("Admin access required"));
        }
        Ok(Self(user))
    }
}
