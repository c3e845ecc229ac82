use crate::{error::AppError, utils::jwt::decode_jwt};
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

/// Caller holding a valid admin bearer token.
///
/// Sessions and accounts live with the operator's identity provider; this service
/// only checks that the token verifies and carries `role = "admin"`.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub subject: String,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = decode_jwt(&token).map_err(|_| AppError::Unauthorized)?;

        if !claims.is_admin() {
            tracing::warn!("Non-admin token for '{}' rejected", claims.sub);
            return Err(AppError::Forbidden);
        }

        Ok(AdminUser {
            subject: claims.sub,
        })
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;

    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_token_is_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic Zm9vOmJhcg=="),
        );
        assert!(extract_bearer_token(&headers).is_none());
        assert!(extract_bearer_token(&HeaderMap::new()).is_none());
    }
}
