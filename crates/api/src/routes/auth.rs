//! Caller identity extracted from request headers.
//!
//! Authentication happens upstream; this service trusts `x-user-id` and
//! `x-role` as forwarded by the gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLE_HEADER: &str = "x-role";

/// The identified caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: UserId,
    pub is_admin: bool,
}

/// A caller holding the admin role.
#[derive(Debug, Clone, Copy)]
pub struct Admin;

fn is_admin(parts: &Parts) -> bool {
    parts
        .headers
        .get(ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"))
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;
        let uuid = raw
            .to_str()
            .ok()
            .and_then(|s| uuid::Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))?;

        Ok(Caller {
            user_id: UserId::from_uuid(uuid),
            is_admin: is_admin(parts),
        })
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if is_admin(parts) {
            Ok(Admin)
        } else {
            Err(ApiError::Forbidden("Admin role required".to_string()))
        }
    }
}
