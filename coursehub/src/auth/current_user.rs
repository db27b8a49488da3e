use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::session,
    errors::{Error, Result},
    types::Operation,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, instrument, trace};

/// Extract user from a bearer JWT in the Authorization header if present.
/// Returns:
/// - None: No Authorization header or not a Bearer token
/// - Some(Ok(user)): Valid token found and verified
/// - Some(Err(error)): Bearer token present but invalid/expired
#[instrument(skip(parts, config))]
fn try_bearer_auth(parts: &Parts, config: &crate::config::Config) -> Option<Result<CurrentUser>> {
    let auth_header = parts.headers.get(axum::http::header::AUTHORIZATION)?;

    let auth_str = match auth_header.to_str() {
        Ok(s) => s,
        Err(e) => {
            return Some(Err(Error::BadRequest {
                message: format!("Invalid authorization header: {e}"),
            }));
        }
    };

    let token = match auth_str.strip_prefix("Bearer ") {
        Some(token) => token,
        None => return None, // Not a Bearer token
    };

    Some(session::verify_session_token(token, config))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_bearer_auth(parts, &state.config) {
            Some(Ok(user)) => {
                debug!("Found bearer authenticated user: {}", user.id);
                Ok(user)
            }
            Some(Err(e)) => {
                trace!("Bearer authentication failed: {:?}", e);
                Err(Error::Unauthenticated { message: None })
            }
            None => {
                trace!("No authentication credentials found in request");
                Err(Error::Unauthenticated { message: None })
            }
        }
    }
}

/// Require the authenticated user to be an admin.
pub fn require_admin(user: &CurrentUser, action: Operation, resource: &str) -> Result<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            action,
            resource: resource.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::create_session_token;
    use uuid::Uuid;

    fn test_config() -> crate::config::Config {
        crate::config::Config {
            secret_key: Some("extractor-test-secret".to_string()),
            ..Default::default()
        }
    }

    fn parts_with_authorization(value: &str) -> Parts {
        let request = axum::http::Request::builder()
            .uri("http://localhost/test")
            .header(axum::http::header::AUTHORIZATION, value)
            .body(())
            .unwrap();

        let (parts, _body) = request.into_parts();
        parts
    }

    #[test]
    fn test_bearer_auth_roundtrip() {
        let config = test_config();
        let user = CurrentUser {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_admin: false,
        };
        let token = create_session_token(&user, &config).unwrap();

        let parts = parts_with_authorization(&format!("Bearer {token}"));
        let extracted = try_bearer_auth(&parts, &config).unwrap().unwrap();
        assert_eq!(extracted.id, user.id);
        assert_eq!(extracted.email, user.email);
    }

    #[test]
    fn test_non_bearer_scheme_is_skipped() {
        let config = test_config();
        let parts = parts_with_authorization("Basic dXNlcjpwYXNz");
        assert!(try_bearer_auth(&parts, &config).is_none());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let config = test_config();
        let parts = parts_with_authorization("Bearer not.a.jwt");
        let result = try_bearer_auth(&parts, &config).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn test_require_admin() {
        let admin = CurrentUser {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            is_admin: true,
        };
        assert!(require_admin(&admin, Operation::Create, "courses").is_ok());

        let user = CurrentUser {
            is_admin: false,
            ..admin
        };
        let err = require_admin(&user, Operation::Create, "courses").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
