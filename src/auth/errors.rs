//! Authentication error types.

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, build_clear_cookie};

/// Closed set of reasons an authentication attempt can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No usable credentials were presented.
    Unauthenticated,
    /// A presented refresh token was malformed or past its expiry.
    Expired,
    /// The refresh token's JTI is no longer in the user's stored list,
    /// or the token's user no longer exists.
    Revoked,
    /// The account has been closed.
    AccountInactive,
    /// Storage failure while resolving identity.
    Internal,
}

impl AuthErrorKind {
    /// Whether the failure is an auth decision that should discard the
    /// client's cookies. Missing credentials and infrastructure failures
    /// leave cookies untouched.
    fn clears_cookies(&self) -> bool {
        matches!(
            self,
            AuthErrorKind::Expired | AuthErrorKind::Revoked | AuthErrorKind::AccountInactive
        )
    }
}

/// API authentication rejection: JSON body, and cleared cookies when the
/// failure is a definitive auth decision.
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
    pub(super) secure_cookies: bool,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind, secure_cookies: bool) -> Self {
        Self {
            kind,
            secure_cookies,
        }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.kind {
            AuthErrorKind::Unauthenticated
            | AuthErrorKind::Expired
            | AuthErrorKind::Revoked
            | AuthErrorKind::AccountInactive => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::Unauthenticated => "Not authenticated",
            AuthErrorKind::Expired => "Invalid or expired token",
            AuthErrorKind::Revoked => "Token has been revoked",
            AuthErrorKind::AccountInactive => "Account is closed",
            AuthErrorKind::Internal => "Internal error",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use axum::http::HeaderValue;
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        if self.kind.clears_cookies() {
            let clear_access = build_clear_cookie(ACCESS_COOKIE_NAME, self.secure_cookies);
            let clear_refresh = build_clear_cookie(REFRESH_COOKIE_NAME, self.secure_cookies);

            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&clear_access) {
                headers.append(header::SET_COOKIE, value);
            }
            if let Ok(value) = HeaderValue::from_str(&clear_refresh) {
                headers.append(header::SET_COOKIE, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn cookie_headers(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_revoked_clears_cookies() {
        let response =
            ApiAuthError::new(AuthErrorKind::Revoked, false).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let cookies = cookie_headers(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[test]
    fn test_unauthenticated_keeps_cookies() {
        let response =
            ApiAuthError::new(AuthErrorKind::Unauthenticated, false).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(cookie_headers(&response).is_empty());
    }

    #[test]
    fn test_internal_is_500_and_keeps_cookies() {
        let response = ApiAuthError::new(AuthErrorKind::Internal, false).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(cookie_headers(&response).is_empty());
    }

    #[test]
    fn test_inactive_account_is_401_and_clears() {
        let response =
            ApiAuthError::new(AuthErrorKind::AccountInactive, false).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(cookie_headers(&response).len(), 2);
    }
}
