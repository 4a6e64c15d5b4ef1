use crate::adapters::postgrest::error_for_status;
use crate::domain::ports::IdentityProvider;
use crate::utils::error::{BookingError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

/// Identity fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<String>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user_id(&self) -> Result<Option<String>> {
        Ok(self.user_id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

/// Resolves a session access token through the hosted auth API (`/auth/v1/user`).
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl SessionIdentity {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[async_trait]
impl IdentityProvider for SessionIdentity {
    async fn current_user_id(&self) -> Result<Option<String>> {
        let Some(token) = self.access_token.as_deref() else {
            tracing::debug!("No access token, treating caller as signed out");
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| BookingError::store_unavailable(format!("auth lookup failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::debug!("Access token rejected by auth service");
                Ok(None)
            }
            status if status.is_success() => {
                let user: AuthUser = response.json().await?;
                Ok(Some(user.id).filter(|id| !id.trim().is_empty()))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(error_for_status(status, body))
            }
        }
    }
}
