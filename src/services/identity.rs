//! Identity provider adapter
//!
//! Exchanges an OAuth authorization code against the external identity
//! provider for a stable external identity (email, display name, avatar).
//! The adapter is the only component that talks to the provider; everything
//! downstream works with [`ExternalIdentity`].
//!
//! The provider is behind a trait so tests can substitute a stub instead of
//! a live OAuth endpoint.

use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde::Deserialize;

/// Stable identity returned by the external provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Email address (unique per provider account)
    pub email: String,
    /// Display name as known to the provider
    pub name: Option<String>,
    /// Avatar URL as known to the provider
    pub avatar: Option<String>,
}

/// Error types for identity exchange
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The provider rejected the authorization code
    #[error("Identity provider rejected the authorization code")]
    ExchangeRejected,

    /// The provider response did not contain an email
    #[error("Identity provider returned no email address")]
    MissingEmail,

    /// Transport or decoding failure
    #[error("Identity provider request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Identity provider abstraction
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an OAuth authorization code for the account's identity
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityError>;
}

/// OAuth-over-HTTP identity provider
///
/// Performs the standard two-step exchange: authorization code to access
/// token at the token endpoint, then a bearer-authenticated userinfo fetch.
pub struct HttpIdentityProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl HttpIdentityProvider {
    /// Create a new provider adapter from configuration
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserinfoResponse {
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<ExternalIdentity, IdentityError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let token_response = self
            .client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        if !token_response.status().is_success() {
            return Err(IdentityError::ExchangeRejected);
        }

        let token: TokenResponse = token_response.json().await?;

        let userinfo_response = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;

        if !userinfo_response.status().is_success() {
            return Err(IdentityError::ExchangeRejected);
        }

        let userinfo: UserinfoResponse = userinfo_response.json().await?;

        let email = userinfo.email.ok_or(IdentityError::MissingEmail)?;

        Ok(ExternalIdentity {
            email,
            name: userinfo.name,
            avatar: userinfo.picture,
        })
    }
}
