use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::types::{Check, HttpMethod};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe target {target}: {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out")]
    TimedOut,
}

/// A fully resolved probe request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub url: Url,
    pub method: HttpMethod,
    pub timeout: Duration,
}

impl ProbeRequest {
    /// Build the request for a check.
    ///
    /// An explicit port is only honoured for `localhost`; every other host is
    /// reached on the scheme's default port.
    pub fn for_check(check: &Check) -> Result<Self, ProbeError> {
        let target = check.target();
        let mut url = Url::parse(&target).map_err(|e| ProbeError::InvalidTarget {
            target: target.clone(),
            reason: e.to_string(),
        })?;

        let is_localhost = url.host_str() == Some("localhost");
        if !is_localhost && url.port().is_some() {
            url.set_port(None).map_err(|()| ProbeError::InvalidTarget {
                target: target.clone(),
                reason: "port cannot be reset".to_string(),
            })?;
        }

        Ok(Self { url, method: check.method, timeout: Duration::from_secs(check.timeout_seconds) })
    }
}

/// Something that can perform a network probe and report the status code
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, request: &ProbeRequest) -> Result<u16, ProbeError>;
}

/// HTTP/HTTPS prober backed by a shared reqwest client
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, request: &ProbeRequest) -> Result<u16, ProbeError> {
        let response = self
            .client
            .request(Self::method(request.method), request.url.clone())
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::TimedOut
                } else {
                    ProbeError::Transport(e.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }
}
