use crate::config::parse_bool_env;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::{env, sync::OnceLock};

/// JSON API defaults; the Swagger UI page needs inline scripts and styles.
const DEFAULT_CSP_POLICY: &str = "default-src 'none'; frame-ancestors 'none'; base-uri 'none'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self' ws: wss:";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

#[derive(Debug, Clone)]
struct SecurityHeaders {
    fixed: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    fn from_env() -> Self {
        let raw_csp = env::var("CSP_POLICY").unwrap_or_else(|_| DEFAULT_CSP_POLICY.to_string());
        let csp = HeaderValue::from_str(&raw_csp).unwrap_or_else(|err| {
            tracing::warn!("Invalid CSP_POLICY ({}), using the default policy", err);
            HeaderValue::from_static(DEFAULT_CSP_POLICY)
        });
        Self::new(csp, parse_bool_env("ENABLE_HSTS", true))
    }

    fn new(csp: HeaderValue, enable_hsts: bool) -> Self {
        let mut fixed = vec![
            (HeaderName::from_static("content-security-policy"), csp),
            (
                HeaderName::from_static("x-content-type-options"),
                HeaderValue::from_static("nosniff"),
            ),
            (
                HeaderName::from_static("x-frame-options"),
                HeaderValue::from_static("DENY"),
            ),
            (
                HeaderName::from_static("referrer-policy"),
                HeaderValue::from_static("no-referrer"),
            ),
            (
                HeaderName::from_static("permissions-policy"),
                HeaderValue::from_static("camera=(), microphone=()"),
            ),
        ];
        if enable_hsts {
            fixed.push((
                HeaderName::from_static("strict-transport-security"),
                HeaderValue::from_static(HSTS_VALUE),
            ));
        }
        Self { fixed }
    }

    fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.fixed {
            headers.insert(name.clone(), value.clone());
        }
    }
}

fn security_headers() -> &'static SecurityHeaders {
    static HEADERS: OnceLock<SecurityHeaders> = OnceLock::new();
    HEADERS.get_or_init(SecurityHeaders::from_env)
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    security_headers().apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsts_is_optional() {
        let mut with = HeaderMap::new();
        SecurityHeaders::new(HeaderValue::from_static("default-src 'none'"), true).apply(&mut with);
        assert!(with.contains_key("strict-transport-security"));
        assert_eq!(with["x-content-type-options"], "nosniff");

        let mut without = HeaderMap::new();
        SecurityHeaders::new(HeaderValue::from_static("default-src 'none'"), false)
            .apply(&mut without);
        assert!(!without.contains_key("strict-transport-security"));
        assert_eq!(without["content-security-policy"], "default-src 'none'");
    }
}
