//! HTTP client for the analytics backend.

use crate::domain::model::{
    AuthResponse, Credentials, Dataset, DatasetDetails, RawRecords, Registration,
    TypeDistribution, UploadResponse, UserProfile,
};
use crate::domain::ports::{AnalyticsApi, ConfigProvider};
use crate::utils::error::{DashError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use url::Url;

pub const DEFAULT_AUTH_SCHEME: &str = "Token";

pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth_scheme: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: &str, auth_scheme: &str, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| DashError::InvalidConfigValueError {
            field: "base_url".to_string(),
            value: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            auth_scheme: auth_scheme.to_string(),
            token: RwLock::new(None),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.base_url(),
            config.auth_scheme(),
            Duration::from_secs(config.request_timeout_secs()),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| DashError::ConfigError {
                message: format!("invalid endpoint path '{}': {}", path, e),
            })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = self.token() {
            request = request.header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", self.auth_scheme, token),
            );
        }
        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        tracing::debug!("API response status: {}", response.status());

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.json().await?)
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .send(self.request(Method::POST, path)?.json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::POST, path)?).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path)?).await?;
        Ok(())
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.send(self.request(Method::GET, path)?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let response = self
            .send(self.request(Method::POST, path)?.multipart(form))
            .await?;
        Ok(response.json().await?)
    }
}

/// Turns a non-2xx response into an `ApiError`, preferring the body's
/// `error`, `message` or `detail` field.
async fn error_from_response(response: Response) -> DashError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| body.clone());
    tracing::debug!("API error {}: {}", status, body);
    DashError::api(status.as_u16(), message)
}

fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error", "message", "detail"].iter().find_map(|key| {
        value.get(*key).map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
    })
}

#[async_trait]
impl AnalyticsApi for ApiClient {
    fn set_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }

    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        self.post("api/login/", credentials).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        self.post("api/register/", registration).await
    }

    async fn logout(&self) -> Result<()> {
        self.post_empty("api/logout/").await
    }

    async fn profile(&self) -> Result<UserProfile> {
        self.get("api/profile/").await
    }

    async fn datasets(&self) -> Result<Vec<Dataset>> {
        match self.get("api/datasets/").await {
            Ok(datasets) => Ok(datasets),
            // The backend answers an empty list with 404 "No datasets found".
            Err(DashError::ApiError { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn dataset_details(&self, id: u64) -> Result<DatasetDetails> {
        self.get(&format!("api/datasets/{}/", id)).await
    }

    async fn type_distribution(&self, id: u64) -> Result<TypeDistribution> {
        self.get(&format!("api/datasets/{}/type_distribution/", id))
            .await
    }

    async fn raw_records(&self, id: u64) -> Result<RawRecords> {
        self.get(&format!("api/datasets/{}/raw/", id)).await
    }

    async fn upload(&self, file: &Path) -> Result<UploadResponse> {
        let data = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());

        tracing::debug!("Uploading {} ({} bytes)", file_name, data.len());
        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);

        self.post_multipart("api/upload/", form).await
    }

    async fn delete_dataset(&self, id: u64) -> Result<()> {
        self.delete(&format!("api/datasets/{}/delete/", id)).await
    }

    async fn download_report(&self, id: u64) -> Result<Vec<u8>> {
        self.get_bytes(&format!("api/datasets/{}/report/", id))
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .request(Method::GET, "api/health_check/")?
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.base_url(), DEFAULT_AUTH_SCHEME, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_join_keeps_base_path() {
        let client =
            ApiClient::new("http://localhost:8000/backend", "Token", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.endpoint("api/datasets/").unwrap().as_str(),
            "http://localhost:8000/backend/api/datasets/"
        );
        assert_eq!(
            client.endpoint("/api/profile/").unwrap().as_str(),
            "http://localhost:8000/backend/api/profile/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ApiClient::new("not a url", "Token", Duration::from_secs(1));
        assert!(matches!(
            result,
            Err(DashError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"error": "Invalid Credentials"}"#).as_deref(),
            Some("Invalid Credentials")
        );
        assert_eq!(
            extract_error_message(r#"{"message": "No datasets found"}"#).as_deref(),
            Some("No datasets found")
        );
        assert_eq!(extract_error_message("<html>"), None);
    }

    #[tokio::test]
    async fn test_token_header_attached() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/profile/")
                .header("Authorization", "Token abc");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "user": {"id": 1, "username": "alice", "email": "a@example.com"},
                    "total_datasets": 0,
                    "datasets": []
                }));
        });

        let client = client(&server);
        client.set_token(Some("abc".into()));
        let profile = client.profile().await.unwrap();

        mock.assert();
        assert_eq!(profile.user.username, "alice");
    }

    #[tokio::test]
    async fn test_datasets_404_is_empty() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/datasets/");
            then.status(404)
                .json_body(serde_json::json!({"message": "No datasets found"}));
        });

        let datasets = client(&server).datasets().await.unwrap();
        assert!(datasets.is_empty());
    }

    #[tokio::test]
    async fn test_error_body_becomes_api_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/datasets/9/raw/");
            then.status(500)
                .json_body(serde_json::json!({"error": "boom"}));
        });

        let err = client(&server).raw_records(9).await.unwrap_err();
        match err {
            DashError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_health_check_reports_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/health_check/");
            then.status(503);
        });

        assert!(!client(&server).health_check().await.unwrap());
    }
}
