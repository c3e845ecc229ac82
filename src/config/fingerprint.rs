use std::env;

/// How a submitter fingerprint is derived from a request.
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub secret: Vec<u8>,
    /// Use the first `X-Forwarded-For` hop instead of the socket peer.
    pub trust_forwarded_for: bool,
    /// Accept a client-computed `X-Client-Fingerprint` header (still keyed-hashed).
    pub accept_client_header: bool,
}

impl FingerprintConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = env::var("FINGERPRINT_SECRET")
            .map_err(|_| anyhow::anyhow!("FINGERPRINT_SECRET environment variable must be set"))?;
        if secret.len() < 16 {
            return Err(anyhow::anyhow!(
                "FINGERPRINT_SECRET must be at least 16 characters"
            ));
        }

        Ok(Self {
            secret: secret.into_bytes(),
            trust_forwarded_for: super::parse_bool_env("TRUST_FORWARDED_FOR", false),
            accept_client_header: super::parse_bool_env("ACCEPT_CLIENT_FINGERPRINT", false),
        })
    }
}
