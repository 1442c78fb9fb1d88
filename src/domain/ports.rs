use crate::domain::model::{
    AuthResponse, Credentials, Dataset, DatasetDetails, RawRecords, Registration, Session,
    TypeDistribution, UploadResponse, UserProfile,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Where rendered artifacts (chart SVGs, PDF reports) end up.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Persists the session (token and selected dataset) between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Session>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn auth_scheme(&self) -> &str;
    fn request_timeout_secs(&self) -> u64;
    fn session_path(&self) -> &Path;
    fn output_dir(&self) -> &Path;
}

/// The backend REST API as seen by the dashboard.
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    fn set_token(&self, token: Option<String>);
    fn token(&self) -> Option<String>;

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse>;
    async fn register(&self, registration: &Registration) -> Result<AuthResponse>;
    async fn logout(&self) -> Result<()>;

    async fn profile(&self) -> Result<UserProfile>;
    async fn datasets(&self) -> Result<Vec<Dataset>>;
    async fn dataset_details(&self, id: u64) -> Result<DatasetDetails>;
    async fn type_distribution(&self, id: u64) -> Result<TypeDistribution>;
    async fn raw_records(&self, id: u64) -> Result<RawRecords>;
    async fn upload(&self, file: &Path) -> Result<UploadResponse>;
    async fn delete_dataset(&self, id: u64) -> Result<()>;
    async fn download_report(&self, id: u64) -> Result<Vec<u8>>;
    async fn health_check(&self) -> Result<bool>;
}
