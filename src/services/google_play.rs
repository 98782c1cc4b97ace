use crate::{
    config::GoogleConfig,
    error::{ApiError, Result},
    models::subscription::SubscriptionPurchase,
};
use anyhow::Context;
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

/// Package the verifier is hardwired to; per-request package selection is
/// deliberately not supported.
pub const PACKAGE_NAME: &str = "com.angalamat";

/// Payload attached when acknowledging a purchase from the backend.
pub const DEVELOPER_PAYLOAD: &str = "Acknowledged via backend verification";

const PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this many seconds before the token actually expires.
const TOKEN_EXPIRY_LEEWAY_SECS: i64 = 60;

/// Outbound operations the verifier needs from the billing provider.
///
/// The HTTP layer depends on this trait so tests can substitute an in-memory
/// double for the real Google Play client.
#[async_trait]
pub trait AndroidPublisher: Send + Sync {
    async fn get_subscription(
        &self,
        subscription_id: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionPurchase>;

    async fn acknowledge_subscription(
        &self,
        subscription_id: &str,
        purchase_token: &str,
        developer_payload: &str,
    ) -> Result<()>;
}

pub struct GooglePlayService {
    config: GoogleConfig,
    http_client: reqwest::Client,
    token: tokio::sync::Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - TOKEN_EXPIRY_LEEWAY_SECS > now
    }
}

/// Service-account assertion claims (RFC 7523 profile used by Google OAuth).
#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

impl GooglePlayService {
    pub fn new(config: &GoogleConfig) -> Self {
        Self {
            config: config.clone(),
            http_client: reqwest::Client::new(),
            token: tokio::sync::Mutex::new(None),
        }
    }

    /// Bearer token for the publisher scope. A token obtained earlier in the
    /// same invocation (fetch, then acknowledge) is reused while it is fresh;
    /// otherwise a new assertion is signed and exchanged.
    async fn authorize(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.exchange_assertion(now).await?;
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }

    /// Sign a short-lived assertion and exchange it for a bearer token.
    async fn exchange_assertion(&self, now: i64) -> Result<TokenResponse> {
        let claims = AssertionClaims {
            iss: &self.config.client_email,
            scope: PUBLISHER_SCOPE,
            aud: &self.config.token_uri,
            iat: now,
            exp: now + 3600,
        };

        let key = EncodingKey::from_rsa_pem(self.config.private_key.as_bytes())
            .context("Invalid service-account private key")?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("Failed to sign service-account assertion")?;

        let response = self
            .http_client
            .post(&self.config.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await
            .map_err(request_error)?;

        let response = Self::check_status(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Invalid token response")))?;

        Ok(token)
    }

    fn subscription_url(&self, subscription_id: &str, purchase_token: &str) -> String {
        format!(
            "{}/applications/{}/purchases/subscriptions/{}/tokens/{}",
            self.config.api_base, PACKAGE_NAME, subscription_id, purchase_token
        )
    }

    /// Map a non-success provider response to `ApiError::Provider`, relaying
    /// the provider's status and its error payload.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let error = match body.get("error") {
            Some(error) => error.clone(),
            None => json!("Google API error"),
        };

        Err(ApiError::Provider {
            status: status.as_u16(),
            body: error,
        })
    }
}

fn request_error(e: reqwest::Error) -> ApiError {
    ApiError::Internal(anyhow::Error::new(e).context("Google API request failed"))
}

#[async_trait]
impl AndroidPublisher for GooglePlayService {
    #[instrument(skip(self, purchase_token))]
    async fn get_subscription(
        &self,
        subscription_id: &str,
        purchase_token: &str,
    ) -> Result<SubscriptionPurchase> {
        let access_token = self.authorize().await?;

        let response = self
            .http_client
            .get(self.subscription_url(subscription_id, purchase_token))
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(request_error)?;

        let response = Self::check_status(response).await?;
        let purchase: SubscriptionPurchase = response.json().await.map_err(|e| {
            ApiError::Internal(anyhow::Error::new(e).context("Invalid subscription record"))
        })?;

        info!(subscription_id, "Fetched subscription purchase record");

        Ok(purchase)
    }

    #[instrument(skip(self, purchase_token, developer_payload))]
    async fn acknowledge_subscription(
        &self,
        subscription_id: &str,
        purchase_token: &str,
        developer_payload: &str,
    ) -> Result<()> {
        let access_token = self.authorize().await?;

        let response = self
            .http_client
            .post(format!(
                "{}:acknowledge",
                self.subscription_url(subscription_id, purchase_token)
            ))
            .bearer_auth(&access_token)
            .json(&json!({ "developerPayload": developer_payload }))
            .send()
            .await
            .map_err(request_error)?;

        Self::check_status(response).await?;

        info!(subscription_id, "Acknowledged subscription purchase");

        Ok(())
    }
}
