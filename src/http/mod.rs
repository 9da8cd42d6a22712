//! Generic HTTP client adapter.
//!
//! A [`HttpClient`] sends JSON requests, deserializes success bodies into a
//! caller-supplied shape, and logs one structured record per request. An
//! error-status response is not a transport failure: it comes back as an
//! [`HttpResponse`] with `body: None` so the caller can inspect the status.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{Error, Result};

/// Client construction settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "HttpConfig::default_timeout")]
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Log request bodies at debug level.
    #[serde(default)]
    pub debug: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
            user_agent: None,
            debug: false,
        }
    }
}

impl HttpConfig {
    fn default_timeout() -> u64 {
        30
    }
}

/// Deserialized response plus raw status and timing metadata.
#[derive(Debug)]
pub struct HttpResponse<T> {
    /// Decoded body; `None` when the server answered with an error status.
    pub body: Option<T>,
    pub status: StatusCode,
    pub elapsed: Duration,
}

impl<T> HttpResponse<T> {
    /// Whether the server answered with a non-success status.
    pub fn is_error_state(&self) -> bool {
        !self.status.is_success()
    }
}

/// JSON-first HTTP client.
pub struct HttpClient {
    client: reqwest::Client,
    cfg: HttpConfig,
}

impl HttpClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(cfg.timeout_secs));
        if let Some(agent) = &cfg.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            cfg: cfg.clone(),
        })
    }

    /// Escape hatch: a raw request builder preconfigured for JSON.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &HashMap<String, String>,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse<T>> {
        let request = apply_headers(self.client.get(url).query(query), headers);
        self.execute(Method::GET, url, request).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &HashMap<String, String>,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse<T>> {
        let request = apply_headers(self.client.delete(url).query(query), headers);
        self.execute(Method::DELETE, url, request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse<T>> {
        let request = apply_headers(self.client.post(url).json(body), headers);
        self.execute(Method::POST, url, request).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: &HashMap<String, String>,
    ) -> Result<HttpResponse<T>> {
        let request = apply_headers(self.client.put(url).json(body), headers);
        self.execute(Method::PUT, url, request).await
    }

    /// Multipart upload: form fields plus one file part.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        url: &str,
        fields: &HashMap<String, String>,
        headers: &HashMap<String, String>,
        part_name: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<HttpResponse<T>> {
        let mut form = Form::new().part(
            part_name.to_string(),
            Part::bytes(data).file_name(file_name.to_string()),
        );
        for (key, value) in fields {
            form = form.text(key.clone(), value.clone());
        }
        let mut request = self.client.post(url).multipart(form);
        for (key, value) in headers {
            request = request.header(key.as_str(), value.as_str());
        }
        self.execute(Method::POST, url, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        request: RequestBuilder,
    ) -> Result<HttpResponse<T>> {
        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            error!(%method, url, error = %e, "request failed");
            Error::from(e)
        })?;
        let status = response.status();
        let elapsed = started.elapsed();

        if !status.is_success() {
            error!(%method, url, status = status.as_u16(), ?elapsed, "request returned error state");
            return Ok(HttpResponse {
                body: None,
                status,
                elapsed,
            });
        }

        let text = response.text().await?;
        if self.cfg.debug {
            tracing::debug!(%method, url, body = %text, "response body");
        }
        let body = serde_json::from_str(&text)?;
        info!(%method, url, status = status.as_u16(), ?elapsed, "request completed");
        Ok(HttpResponse {
            body: Some(body),
            status,
            elapsed,
        })
    }
}

fn apply_headers(
    mut request: RequestBuilder,
    headers: &HashMap<String, String>,
) -> RequestBuilder {
    request = request.header(CONTENT_TYPE, "application/json");
    for (key, value) in headers {
        request = request.header(key.as_str(), value.as_str());
    }
    request
}
