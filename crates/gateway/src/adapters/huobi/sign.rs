//! Huobi signature version 2
//!
//! ```text
//! payload = METHOD \n host \n path \n sorted-url-encoded-params
//! Signature = base64(hmac_sha256(secret, payload))
//! ```

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use meridian_core::Timestamp;
use reqwest::Method;
use sha2::Sha256;
use tracing::error;
use url::form_urlencoded;

use crate::error::GatewayError;
use crate::rest::{RequestSigner, RestRequest};

type HmacSha256 = Hmac<Sha256>;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Clone)]
pub struct HuobiSigner {
    api_key: String,
    secret: String,
    host: String,
}

impl std::fmt::Debug for HuobiSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuobiSigner")
            .field("api_key", &self.api_key)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl HuobiSigner {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
            host: host.into(),
        }
    }

    /// Signer for the REST host in `rest_url`
    pub fn for_url(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        rest_url: &str,
    ) -> Result<Self, GatewayError> {
        let (host, _) = split_url(rest_url)?;
        Ok(Self::new(api_key, secret, host))
    }

    /// Signature parameters plus `params`, sorted, with `Signature` last
    pub fn signature_params(
        &self,
        method: &str,
        host: &str,
        path: &str,
        params: &[(String, String)],
        now: Timestamp,
    ) -> Vec<(String, String)> {
        let mut sorted = vec![
            ("AccessKeyId".to_string(), self.api_key.clone()),
            ("SignatureMethod".to_string(), "HmacSHA256".to_string()),
            ("SignatureVersion".to_string(), "2".to_string()),
            ("Timestamp".to_string(), now.format(TIMESTAMP_FORMAT).to_string()),
        ];
        sorted.extend(params.iter().cloned());
        sorted.sort();

        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(sorted.iter())
            .finish();
        let payload = [method, host, path, encoded.as_str()].join("\n");

        match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mut mac) => {
                mac.update(payload.as_bytes());
                let signature = BASE64.encode(mac.finalize().into_bytes());
                sorted.push(("Signature".to_string(), signature));
            }
            Err(e) => error!(error = %e, "Cannot key HMAC, request left unsigned"),
        }
        sorted
    }
}

impl RequestSigner for HuobiSigner {
    fn sign(&self, mut request: RestRequest, now: Timestamp) -> RestRequest {
        request.params = self.signature_params(
            request.method.as_str(),
            &self.host,
            &request.path,
            &request.params,
            now,
        );
        if request.method == Method::POST {
            request
                .headers
                .push(("Content-Type".to_string(), "application/json".to_string()));
        }
        request
    }
}

/// `wss://api.huobi.pro/ws/v1` -> (`api.huobi.pro`, `/ws/v1`)
pub fn split_url(raw: &str) -> Result<(String, String), GatewayError> {
    let url = url::Url::parse(raw).map_err(|e| GatewayError::Config(format!("{raw}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| GatewayError::Config(format!("{raw}: no host")))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok((host, url.path().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn signer() -> HuobiSigner {
        HuobiSigner::new("key", "secret", "api.huobi.pro")
    }

    fn value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_sign_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let request = RestRequest::get("/v1/order/openOrders").with_param("symbol", "btcusdt");

        let first = signer().sign(request.clone(), now);
        let second = signer().sign(request, now);
        assert_eq!(first, second);

        assert_eq!(value(&first.params, "Timestamp"), Some("2024-03-01T09:30:00"));
        assert_eq!(value(&first.params, "AccessKeyId"), Some("key"));
        assert_eq!(value(&first.params, "symbol"), Some("btcusdt"));
        assert_eq!(first.params.last().map(|(k, _)| k.as_str()), Some("Signature"));
    }

    #[test]
    fn test_signature_matches_reference_hmac() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let params = signer().signature_params("GET", "api.huobi.pro", "/v1/account/accounts", &[], now);

        let payload = "GET\napi.huobi.pro\n/v1/account/accounts\n\
            AccessKeyId=key&SignatureMethod=HmacSHA256&SignatureVersion=2&Timestamp=2024-03-01T09%3A30%3A00";
        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(payload.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());

        assert_eq!(value(&params, "Signature"), Some(expected.as_str()));
    }

    #[test]
    fn test_time_changes_signature() {
        let request = RestRequest::get("/v1/account/accounts");
        let a = signer().sign(request.clone(), Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        let b = signer().sign(request, Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 1).unwrap());
        assert_ne!(value(&a.params, "Signature"), value(&b.params, "Signature"));
    }

    #[test]
    fn test_post_gets_json_content_type() {
        let now = Utc::now();
        let signed = signer().sign(
            RestRequest::post("/v1/order/orders/place", serde_json::json!({})),
            now,
        );
        assert!(signed
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn test_split_url() {
        assert_eq!(
            split_url("wss://api.huobi.pro/ws/v1").unwrap(),
            ("api.huobi.pro".to_string(), "/ws/v1".to_string())
        );
        assert_eq!(
            split_url("ws://127.0.0.1:9001/ws").unwrap(),
            ("127.0.0.1:9001".to_string(), "/ws".to_string())
        );
        assert!(split_url("nope").is_err());
    }
}
