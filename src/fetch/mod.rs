// src/fetch/mod.rs

pub mod identity;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, LOCATION},
    redirect, Client,
};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;
use identity::{random_identity, ClientIdentity};

/// Raw response of a single GET. Non-2xx and redirect responses are
/// returned as-is; callers decide what they mean.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub status: u16,
    /// `Location` header of a redirect response.
    pub location: Option<String>,
    pub body: String,
}

impl Document {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Retrieves documents. Implemented by [`FetchClient`]; adapters take it as a
/// trait object so tests can serve canned pages.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// One GET, no retries. `headers` override the defaults by name.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Document, FetchError>;
}

/// HTTP client that never follows redirects and presents a fresh,
/// self-consistent browser identity on every request.
#[derive(Clone)]
pub struct FetchClient {
    client: Client,
    accept_language: String,
}

impl FetchClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::none())
            .gzip(true)
            .cookie_store(true)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            client,
            accept_language: config.accept_language.clone(),
        })
    }
}

/// Browser-like default headers for `identity`.
pub fn default_headers(identity: &ClientIdentity, accept_language: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: &str| {
        if let Ok(v) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), v);
        }
    };
    put("user-agent", &identity.user_agent);
    put(
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.8,*/*;q=0.7",
    );
    put("accept-language", accept_language);
    put("sec-ch-ua", &identity.sec_ch_ua);
    put("sec-ch-ua-mobile", "?0");
    put("sec-ch-ua-platform", &identity.sec_ch_ua_platform);
    put("sec-fetch-dest", "document");
    put("sec-fetch-mode", "navigate");
    put("sec-fetch-site", "none");
    put("upgrade-insecure-requests", "1");
    headers
}

/// Client-hint headers that must agree with the User-Agent.
const CLIENT_HINTS: [&str; 3] = ["sec-ch-ua", "sec-ch-ua-mobile", "sec-ch-ua-platform"];

/// Apply caller overrides on top of `headers`, replacing same-named entries.
///
/// Overriding `user-agent` drops the default client hints, since they
/// describe the generated identity; hints the caller passes are kept.
pub fn apply_overrides(
    headers: &mut HeaderMap,
    overrides: &[(String, String)],
) -> Result<(), FetchError> {
    if overrides
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
    {
        for hint in CLIENT_HINTS {
            headers.remove(hint);
        }
    }
    for (name, value) in overrides {
        let invalid = || FetchError::InvalidHeader { name: name.clone() };
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
        headers.insert(name, value);
    }
    Ok(())
}

#[async_trait]
impl Fetch for FetchClient {
    #[instrument(level = "debug", skip(self, headers))]
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<Document, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let identity = random_identity();
        let mut request_headers = default_headers(&identity, &self.accept_language);
        apply_overrides(&mut request_headers, headers)?;

        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };
        let resp = self
            .client
            .get(parsed)
            .headers(request_headers)
            .send()
            .await
            .map_err(network)?;

        let status = resp.status().as_u16();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(network)?;
        debug!(status, bytes = body.len(), chrome = identity.major_version, "fetched");

        Ok(Document {
            url: url.to_string(),
            status,
            location,
            body,
        })
    }
}
