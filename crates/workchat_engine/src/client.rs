use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use workchat_logging::wc_debug;

use crate::{ApiError, ApiStatus, ChatBody, ChatRequest, Envelope, FailureKind, RemoteFile};

/// Connection settings for the backend. The base URL is always injected here;
/// nothing reads it from the environment.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Uploads carry whole files and get their own, longer, deadline.
    pub upload_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            user_agent: "WorkChat".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            upload_timeout: Duration::from_secs(300),
        }
    }
}

/// The backend's HTTP surface, one method per endpoint.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatBody, ApiError>;
    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError>;
    async fn upload_file(&self, path: &Path) -> Result<(), ApiError>;
    async fn delete_file(&self, name: &str) -> Result<(), ApiError>;
    async fn run_indexer(&self) -> Result<(), ApiError>;
    async fn status(&self) -> Result<ApiStatus, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    settings: ApiSettings,
    api_root: Url,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let mut api_root = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        api_root
            .path_segments_mut()
            .map_err(|_| {
                ApiError::new(
                    FailureKind::InvalidRequest,
                    format!("base url {} cannot carry a path", settings.base_url),
                )
            })?
            .pop_if_empty()
            .extend(["api", "v1"]);

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            settings,
            api_root,
            client,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// `{base}/api/v1/{segments...}`, each segment percent-encoded on its own.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_root.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::new(FailureKind::MalformedBody, err.to_string()))?;

        if !envelope.success {
            let message = envelope
                .msg
                .clone()
                .unwrap_or_else(|| "success: false".to_string());
            return Err(ApiError::new(FailureKind::Application, message));
        }
        Ok(envelope)
    }

    async fn execute_body<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.execute::<T>(request)
            .await?
            .body
            .ok_or_else(|| ApiError::new(FailureKind::MalformedBody, "missing body"))
    }

    async fn execute_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute::<serde_json::Value>(request).await.map(|_| ())
    }
}

#[async_trait::async_trait]
impl Backend for ReqwestBackend {
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatBody, ApiError> {
        let payload = serde_json::to_vec(request)
            .map_err(|err| ApiError::new(FailureKind::InvalidRequest, err.to_string()))?;
        let url = self.endpoint(&["chats"]);
        wc_debug!("POST {} turns={}", url, request.chats.len());
        self.execute_body(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload),
        )
        .await
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError> {
        let url = self.endpoint(&["files", "list"]);
        wc_debug!("GET {}", url);
        self.execute_body(self.client.get(url)).await
    }

    async fn upload_file(&self, path: &Path) -> Result<(), ApiError> {
        let data = tokio::fs::read(path).await.map_err(|err| {
            ApiError::new(
                FailureKind::InvalidRequest,
                format!("cannot read {}: {err}", path.display()),
            )
        })?;
        let file_name = file_name_of(path);
        let url = self.endpoint(&["files", "upload"]);
        wc_debug!("POST {} file={} bytes={}", url, file_name, data.len());

        let form = Form::new().part("file", Part::bytes(data).file_name(file_name));
        self.execute_unit(
            self.client
                .post(url)
                .timeout(self.settings.upload_timeout)
                .multipart(form),
        )
        .await
    }

    async fn delete_file(&self, name: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["files", name, "delete"]);
        wc_debug!("POST {}", url);
        self.execute_unit(self.client.post(url)).await
    }

    async fn run_indexer(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["indexer", "run"]);
        wc_debug!("POST {}", url);
        self.execute_unit(self.client.post(url)).await
    }

    async fn status(&self) -> Result<ApiStatus, ApiError> {
        let url = self.api_root.clone();
        wc_debug!("GET {}", url);
        self.execute_body(self.client.get(url)).await
    }
}

/// Name a file is stored under: its last path component.
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return ApiError::new(FailureKind::InvalidRequest, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::MalformedBody, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_at(base: &str) -> ReqwestBackend {
        ReqwestBackend::new(ApiSettings {
            base_url: base.to_string(),
            ..ApiSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_hang_off_api_v1() {
        let backend = backend_at("http://localhost:8000");
        assert_eq!(
            backend.endpoint(&["files", "list"]).as_str(),
            "http://localhost:8000/api/v1/files/list"
        );

        let backend = backend_at("https://chat.example.com/workchat/");
        assert_eq!(
            backend.endpoint(&["chats"]).as_str(),
            "https://chat.example.com/workchat/api/v1/chats"
        );
    }

    #[test]
    fn file_names_are_encoded_as_one_segment() {
        let backend = backend_at("http://localhost:8000");
        assert_eq!(
            backend.endpoint(&["files", "Q3 report/v2.pdf", "delete"]).as_str(),
            "http://localhost:8000/api/v1/files/Q3%20report%2Fv2.pdf/delete"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = ReqwestBackend::new(ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidRequest);

        let err = ReqwestBackend::new(ApiSettings {
            base_url: "mailto:someone@example.com".to_string(),
            ..ApiSettings::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidRequest);
    }
}
