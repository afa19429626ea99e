use std::{fmt, sync::Arc};

use gcp_auth::TokenProvider;

use crate::error::AdminError;

use super::AdminResult;

/// Pre-minted token that bypasses Application Default Credentials.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Clone)]
pub enum Credentials {
    /// Plain-http endpoints (local emulators and test servers) take no token.
    Anonymous,
    Static(String),
    /// Application Default Credentials; tokens are cached and refreshed by the provider.
    Provider(Arc<dyn TokenProvider>),
}

impl fmt::Debug for Credentials {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Static(_) => f.write_str("Static(..)"),
            Self::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}

impl Credentials {
    pub async fn resolve() -> AdminResult<Self> {
        if let Some(credentials) = Self::from_override(std::env::var(ACCESS_TOKEN_ENV).ok()) {
            tracing::debug!("using access token from {ACCESS_TOKEN_ENV}");
            return Ok(credentials);
        }

        tracing::debug!("looking up application default credentials");
        let provider = gcp_auth::provider().await.map_err(auth_error)?;
        Ok(Self::Provider(provider))
    }

    fn from_override(raw: Option<String>) -> Option<Self> {
        normalize_token(raw).map(Self::Static)
    }

    /// Attaches a bearer token, fetching a fresh one from the provider when needed.
    pub async fn authorize(
        &self,
        request: reqwest::RequestBuilder,
    ) -> AdminResult<reqwest::RequestBuilder> {
        match self {
            Self::Anonymous => Ok(request),
            Self::Static(token) => Ok(request.bearer_auth(token)),
            Self::Provider(provider) => {
                let token = provider
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(auth_error)?;
                Ok(request.bearer_auth(token.as_str()))
            }
        }
    }
}

fn auth_error(error: gcp_auth::Error) -> AdminError {
    AdminError::Auth(error.to_string())
}

fn normalize_token(raw: Option<String>) -> Option<String> {
    raw.map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
