use crate::domain::model::{AuthResponse, Credentials, Registration};
use crate::domain::ports::{AnalyticsApi, SessionStore};
use crate::utils::error::{DashError, Result};

/// Exchanges credentials for a token and keeps it in the session.
pub struct AuthFlow<'a, A: AnalyticsApi, S: SessionStore> {
    api: &'a A,
    sessions: &'a S,
}

impl<'a, A: AnalyticsApi, S: SessionStore> AuthFlow<'a, A, S> {
    pub fn new(api: &'a A, sessions: &'a S) -> Self {
        Self { api, sessions }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        // An old, revoked token would make the backend reject the request.
        self.api.set_token(None);
        let response = self.api.login(&credentials).await.map_err(|e| {
            tracing::warn!("Login failed for '{}': {}", username, e);
            match e {
                DashError::HttpError(_) => e,
                _ => DashError::InvalidCredentials,
            }
        })?;

        self.store_token(&response)?;
        tracing::info!("🔑 Logged in as {}", username);
        Ok(response)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let registration = Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };

        self.api.set_token(None);
        let response = self.api.register(&registration).await.map_err(|e| {
            tracing::warn!("Registration failed for '{}': {}", username, e);
            match e {
                DashError::HttpError(_) => e,
                DashError::ApiError { message, .. } => DashError::RegistrationFailed { message },
                other => DashError::RegistrationFailed {
                    message: other.to_string(),
                },
            }
        })?;

        self.store_token(&response)?;
        tracing::info!("🆕 Registered {}", username);
        Ok(response)
    }

    fn store_token(&self, response: &AuthResponse) -> Result<()> {
        // A fresh login starts without a stale selection from another account.
        let mut session = self.sessions.load().unwrap_or_default();
        session.token = Some(response.token.clone());
        session.selected_dataset = None;
        self.sessions.save(&session)?;
        self.api.set_token(Some(response.token.clone()));
        Ok(())
    }
}
