//! The HTTP seam of the weather client.

use crate::weather::error::TransportError;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// A single JSON GET exchange. Implementations make exactly one attempt;
/// retrying is the caller's concern.
pub trait Transport: Send + Sync {
    fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        debug!("GET {} {:?}", url, params);
        let response = self
            .client
            .get(url)
            .query(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TransportError::NetworkRequest(url.to_string(), e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("HTTP error for {}: {}", url, status);
            return Err(TransportError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode(url.to_string(), e))
    }
}
