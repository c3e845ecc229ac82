use crate::{config::fingerprint::FingerprintConfig, error::AppError, utils::derive_fingerprint};
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::net::SocketAddr;

pub const CLIENT_FINGERPRINT_HEADER: &str = "x-client-fingerprint";
const MAX_CLIENT_FINGERPRINT_LEN: usize = 256;

/// Keyed hash identifying a submitter for upvote uniqueness and spam rate limiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterFingerprint(pub String);

impl<S> FromRequestParts<S> for SubmitterFingerprint
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let config = parts
            .extensions
            .get::<FingerprintConfig>()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("fingerprint config missing")))?;

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let raw = raw_identity(config, &parts.headers, peer);
        Ok(SubmitterFingerprint(derive_fingerprint(&config.secret, &raw)))
    }
}

/// Client header (when accepted), then the first forwarded hop (when trusted),
/// then the socket peer.
fn raw_identity(config: &FingerprintConfig, headers: &HeaderMap, peer: Option<String>) -> String {
    if config.accept_client_header {
        if let Some(value) = header_str(headers, CLIENT_FINGERPRINT_HEADER) {
            if value.len() <= MAX_CLIENT_FINGERPRINT_LEN {
                return format!("client:{}", value);
            }
        }
    }

    if config.trust_forwarded_for {
        if let Some(hop) = header_str(headers, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return hop.to_string();
        }
    }

    peer.unwrap_or_else(|| "unknown".to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
