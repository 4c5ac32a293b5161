//! Actor classification from request credentials.

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Well-known basic-auth username used by CI jobs.
pub const CI_USERNAME: &str = "ci-token";

/// Coarse classification of the requesting actor, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorClass {
    /// No credentials supplied.
    Anonymous,
    /// Basic-auth credentials for a regular user.
    Logged,
    /// Basic-auth credentials with the well-known CI username.
    CiToken,
}

impl ActorClass {
    /// Derives the actor class from the request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match basic_auth_username(headers) {
            Some(user) if user == CI_USERNAME => Self::CiToken,
            Some(_) => Self::Logged,
            None => Self::Anonymous,
        }
    }

    /// The label value for this class.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Logged => "logged",
            Self::CiToken => "ci-token",
        }
    }
}

/// Extracts the username from a `Basic` authorization header, if any.
fn basic_auth_username(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, _password) = text.split_once(':')?;
    Some(username.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_no_credentials_is_anonymous() {
        assert_eq!(
            ActorClass::from_headers(&HeaderMap::new()),
            ActorClass::Anonymous
        );
    }

    #[test]
    fn test_user_credentials_are_logged() {
        // "alice:wonderland"
        let headers = headers_with_auth("Basic YWxpY2U6d29uZGVybGFuZA==");
        assert_eq!(ActorClass::from_headers(&headers), ActorClass::Logged);
    }

    #[test]
    fn test_ci_username_is_ci_token() {
        // "ci-token:secret"
        let headers = headers_with_auth("Basic Y2ktdG9rZW46c2VjcmV0");
        assert_eq!(ActorClass::from_headers(&headers), ActorClass::CiToken);
    }

    #[test]
    fn test_non_basic_scheme_is_anonymous() {
        let headers = headers_with_auth("Bearer some-token");
        assert_eq!(ActorClass::from_headers(&headers), ActorClass::Anonymous);
    }

    #[test]
    fn test_malformed_base64_is_anonymous() {
        let headers = headers_with_auth("Basic !!!not-base64!!!");
        assert_eq!(ActorClass::from_headers(&headers), ActorClass::Anonymous);
    }

    #[test]
    fn test_missing_colon_is_anonymous() {
        // "nocolonhere"
        let headers = headers_with_auth("Basic bm9jb2xvbmhlcmU=");
        assert_eq!(ActorClass::from_headers(&headers), ActorClass::Anonymous);
    }

    #[test]
    fn test_label_values() {
        assert_eq!(ActorClass::Anonymous.as_str(), "anonymous");
        assert_eq!(ActorClass::Logged.as_str(), "logged");
        assert_eq!(ActorClass::CiToken.as_str(), "ci-token");
    }
}
