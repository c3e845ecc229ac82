use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Keyed, non-reversible submitter token: raw network addresses never reach the store.
pub fn derive_fingerprint(secret: &[u8], raw: &str) -> String {
    let digest = match HmacSha256::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(raw.trim().as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        Err(_) => {
            let mut h = Sha256::new();
            h.update(secret);
            h.update(raw.trim().as_bytes());
            h.finalize().to_vec()
        }
    };
    URL_SAFE_NO_PAD.encode(digest)
}
