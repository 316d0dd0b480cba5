//! Per-request credentials carried in headers
//!
//! The report passphrase travels with every protected request and is never
//! cached server side. Account identity is established upstream; this layer
//! only reads the header the authenticating proxy sets.

use axum::http::header::HeaderMap;
use callisto_crypto::Passphrase;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

pub const REPORT_KEY_HEADER: &str = "X-Report-Key";
pub const ACCOUNT_HEADER: &str = "X-Account-Id";
pub const SITE_HEADER: &str = "X-Site-Id";

/// Who is asking, and on which site
#[derive(Clone, Copy, Debug)]
pub struct Caller {
    pub account: Uuid,
    pub site_id: u32,
}

pub fn extract_caller(headers: &HeaderMap, default_site_id: u32) -> ServerResult<Caller> {
    let account = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServerError::Unauthorized("Missing X-Account-Id header".into()))?;
    let account = Uuid::parse_str(account)
        .map_err(|_| ServerError::Unauthorized("Invalid X-Account-Id header".into()))?;

    let site_id = match headers.get(SITE_HEADER) {
        None => default_site_id,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| ServerError::BadRequest("Invalid X-Site-Id header".into()))?,
    };

    Ok(Caller { account, site_id })
}

pub fn extract_report_key(headers: &HeaderMap) -> ServerResult<Passphrase> {
    let key = headers
        .get(REPORT_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::Unauthorized("Missing X-Report-Key header".into()))?;
    Ok(Passphrase::new(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_defaults_site() {
        let account = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCOUNT_HEADER,
            HeaderValue::from_str(&account.to_string()).unwrap(),
        );

        let caller = extract_caller(&headers, 7).unwrap();
        assert_eq!(caller.account, account);
        assert_eq!(caller.site_id, 7);

        headers.insert(SITE_HEADER, HeaderValue::from_static("3"));
        assert_eq!(extract_caller(&headers, 7).unwrap().site_id, 3);

        headers.insert(SITE_HEADER, HeaderValue::from_static("three"));
        assert!(matches!(
            extract_caller(&headers, 7),
            Err(ServerError::BadRequest(_))
        ));
    }

    #[test]
    fn test_missing_credentials() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_caller(&headers, 1),
            Err(ServerError::Unauthorized(_))
        ));
        assert!(matches!(
            extract_report_key(&headers),
            Err(ServerError::Unauthorized(_))
        ));
    }
}
