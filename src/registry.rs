use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::domain::Cnpj;
use crate::error::EnrichError;

pub const DEFAULT_BASE_URL: &str = "https://www.receitaws.com.br/v1/cnpj";

pub trait RegistryClient {
    /// An upstream `"status": "ERROR"` is returned as `RegistryRejected`.
    fn lookup(&self, cnpj: &Cnpj) -> Result<Value, EnrichError>;
}

impl<R: RegistryClient + ?Sized> RegistryClient for &R {
    fn lookup(&self, cnpj: &Cnpj) -> Result<Value, EnrichError> {
        (**self).lookup(cnpj)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

#[derive(Clone)]
pub struct ReceitaHttpClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ReceitaHttpClient {
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, EnrichError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("cnpj-enrich/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| EnrichError::RegistryHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| EnrichError::RegistryHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn lookup_url(&self, cnpj: &Cnpj) -> String {
        format!("{}/{}", self.base_url, cnpj.as_str())
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, EnrichError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "registry request failed".to_string());
        Err(EnrichError::RegistryStatus { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, EnrichError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        let mut attempt = 1u32;
        loop {
            let response = make_req().send();
            let retry = match &response {
                Ok(resp) => is_retryable_status(resp.status().as_u16()),
                Err(err) => is_retryable_error(err),
            };
            if !retry || attempt >= self.retry.max_attempts {
                return response.map_err(|err| EnrichError::RegistryHttp(err.to_string()));
            }
            let delay = self.retry.backoff(attempt);
            match &response {
                Ok(resp) => debug!(attempt, status = resp.status().as_u16(), ?delay, "retrying registry request"),
                Err(err) => debug!(attempt, error = %err, ?delay, "retrying registry request"),
            }
            thread::sleep(delay);
            attempt += 1;
        }
    }
}

impl RegistryClient for ReceitaHttpClient {
    fn lookup(&self, cnpj: &Cnpj) -> Result<Value, EnrichError> {
        let url = self.lookup_url(cnpj);
        let response = self.send_with_retries(|| self.client.get(&url))?;
        let response = Self::handle_status(response)?;
        let payload: Value = response
            .json()
            .map_err(|err| EnrichError::RegistryHttp(err.to_string()))?;
        check_payload_status(cnpj, payload)
    }
}

pub fn check_payload_status(cnpj: &Cnpj, payload: Value) -> Result<Value, EnrichError> {
    if payload.get("status").and_then(|value| value.as_str()) == Some("ERROR") {
        let message = payload
            .get("message")
            .and_then(|value| value.as_str())
            .unwrap_or("registry returned ERROR")
            .to_string();
        return Err(EnrichError::RegistryRejected {
            cnpj: cnpj.as_str().to_string(),
            message,
        });
    }
    Ok(payload)
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
