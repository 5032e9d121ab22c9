//! Access-token plumbing for the remote repository API.
//!
//! Every request carries an access token obtained from a [`TokenSource`].
//! Signed app JWTs are the host's concern: implement [`AppJwtSigner`] with
//! whatever key management the host already has, and
//! [`InstallationTokenSource`] will exchange its short-lived JWTs for
//! installation access tokens.

use crate::error::ClientError;
use crate::remote::api::{AccessTokenGrant, InstallationInfo};
use crate::remote::RestTransport;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Supplies the access token attached to every API request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, ClientError>;
}

/// A fixed token (personal access token or pre-exchanged installation token).
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, ClientError> {
        Ok(self.token.clone())
    }
}

/// Produces short-lived signed app JWTs.
///
/// Token signing stays outside this crate; the host owns the private key.
pub trait AppJwtSigner: Send + Sync {
    fn signed_jwt(&self) -> Result<String, ClientError>;
}

struct CachedToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Exchanges an app JWT for an installation access token and caches it
/// until shortly before it expires.
pub struct InstallationTokenSource {
    signer: Arc<dyn AppJwtSigner>,
    transport: Arc<dyn RestTransport>,
    api_base: String,
    cached: Mutex<Option<CachedToken>>,
}

/// Refresh this long before the remote-reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

impl InstallationTokenSource {
    pub fn new(
        signer: Arc<dyn AppJwtSigner>,
        transport: Arc<dyn RestTransport>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            signer,
            transport,
            api_base: api_base.into(),
            cached: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<CachedToken, ClientError> {
        let jwt = self.signer.signed_jwt()?;
        let bearer = format!("Bearer {}", jwt);

        let installations = self
            .transport
            .get(&format!("{}/app/installations", self.api_base), &bearer)
            .await?;
        // A single-installation app may answer with a bare object.
        let installation = match installations {
            Value::Array(mut items) if !items.is_empty() => items.remove(0),
            Value::Array(_) => {
                return Err(ClientError::AuthFailed(
                    "app has no installations".to_string(),
                ))
            }
            other => other,
        };
        let info: InstallationInfo = serde_json::from_value(installation)?;
        let install_id = info
            .html_url
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ClientError::AuthFailed(format!(
                    "cannot extract installation id from '{}'",
                    info.html_url
                ))
            })?
            .to_string();

        let grant_value = self
            .transport
            .post(
                &format!(
                    "{}/app/installations/{}/access_tokens",
                    self.api_base, install_id
                ),
                &bearer,
                json!({}),
            )
            .await?;
        let grant: AccessTokenGrant = serde_json::from_value(grant_value)?;
        let expires_at = grant
            .expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        debug!(installation = %install_id, "exchanged app JWT for installation token");
        Ok(CachedToken {
            token: grant.token,
            expires_at,
        })
    }
}

#[async_trait]
impl TokenSource for InstallationTokenSource {
    async fn access_token(&self) -> Result<String, ClientError> {
        {
            let guard = self.cached.lock();
            if let Some(cached) = guard.as_ref() {
                let still_valid = match cached.expires_at {
                    Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < expiry,
                    None => true,
                };
                if still_valid {
                    return Ok(cached.token.clone());
                }
            }
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *self.cached.lock() = Some(fresh);
        Ok(token)
    }
}
