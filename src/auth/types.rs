//! Authentication user types.

use crate::jwt::AccessClaims;

/// Authenticated user information attached to a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token
    pub claims: AccessClaims,
    /// Database user ID
    pub user_id: i64,
}
