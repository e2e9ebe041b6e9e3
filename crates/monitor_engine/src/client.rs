use std::time::Duration;

use futures_util::StreamExt;
use monitor_core::{ApiError, ChangeReport, FailureKind, ReloadResult};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub check_path: String,
    pub reload_path: String,
    /// Existing session cookie string, forwarded verbatim.
    pub cookie: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            check_path: "/dashboard/api/check-changes/".to_string(),
            reload_path: "/dashboard/api/force-reload/".to_string(),
            cookie: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 1024 * 1024,
        }
    }
}

/// The two endpoints the monitor talks to.
#[async_trait::async_trait]
pub trait ChangeApi: Send + Sync {
    async fn check_changes(&self) -> Result<ChangeReport, ApiError>;

    async fn force_reload(&self, csrf_token: &str) -> Result<ReloadResult, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestChangeApi {
    settings: ClientSettings,
    client: reqwest::Client,
    check_url: reqwest::Url,
    reload_url: reqwest::Url,
}

#[derive(Deserialize)]
struct ServerError {
    error: String,
}

impl ReqwestChangeApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = reqwest::Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|err| ApiError::new(FailureKind::InvalidUrl, format!("{path}: {err}")))
        };
        let check_url = join(&settings.check_path)?;
        let reload_url = join(&settings.reload_path)?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            client,
            check_url,
            reload_url,
        })
    }

    pub fn check_url(&self) -> &reqwest::Url {
        &self.check_url
    }

    pub fn reload_url(&self) -> &reqwest::Url {
        &self.reload_url
    }

    fn with_cookie(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.settings.cookie.as_deref() {
            Some(cookie) if !cookie.is_empty() => request.header(COOKIE, cookie),
            _ => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, content_len));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(too_large(self.settings.max_bytes, next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        if !status.is_success() {
            // Both endpoints answer `{"error": "..."}` on server-side failure.
            let message = serde_json::from_slice::<ServerError>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::Malformed, err.to_string()))
    }
}

#[async_trait::async_trait]
impl ChangeApi for ReqwestChangeApi {
    async fn check_changes(&self) -> Result<ChangeReport, ApiError> {
        let response = self
            .with_cookie(self.client.get(self.check_url.clone()))
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.read_json(response).await
    }

    async fn force_reload(&self, csrf_token: &str) -> Result<ReloadResult, ApiError> {
        let response = self
            .with_cookie(self.client.post(self.reload_url.clone()))
            .header(CSRF_HEADER, csrf_token)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        self.read_json(response).await
    }
}

fn too_large(max_bytes: u64, actual: u64) -> ApiError {
    ApiError::new(
        FailureKind::TooLarge {
            max_bytes,
            actual: Some(actual),
        },
        "response too large",
    )
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidUrl, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
