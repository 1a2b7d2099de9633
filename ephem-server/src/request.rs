use crate::HttpSettings;
use axum::http::HeaderMap;
use ephem_api::{Pastes, Timestamp};

/// Header carrying a per-request "now" in epoch milliseconds (test mode only)
pub const TEST_NOW_HEADER: &str = "x-test-now-ms";

/// The instant a request is evaluated at.
///
/// In test mode a well-formed `x-test-now-ms` header pins it for this request
/// only; otherwise the service clock decides.
pub fn request_now(headers: &HeaderMap, settings: &HttpSettings, pastes: &Pastes) -> Timestamp {
    if settings.test_mode {
        let pinned = headers
            .get(TEST_NOW_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<i64>().ok());
        if let Some(ms) = pinned {
            return Timestamp::from_millis(ms);
        }
    }
    pastes.now()
}

/// Base for paste links: configured URL, else derived from proxy and host headers
pub fn base_url(headers: &HeaderMap, settings: &HttpSettings) -> String {
    if let Some(base) = &settings.base_url {
        return base.clone();
    }

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let proto = header("x-forwarded-proto")
        .and_then(|p| p.split(',').next())
        .map(str::trim)
        .unwrap_or("http");
    let host = header("host")
        .or_else(|| header("x-forwarded-host"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("localhost:{}", settings.port));

    format!("{}://{}", proto, host)
}
