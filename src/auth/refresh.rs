//! Single-flight access token refresh
//!
//! Many requests can discover an expired token at the same moment. Refresh
//! tokens rotate on every use, so two independent refreshes would race and
//! the loser would store a token the server has already invalidated. The
//! coordinator keeps at most one `/auth/refresh` call outstanding and hands
//! every concurrent caller that call's result.
//!
//! The state machine is `IDLE -> REFRESHING -> IDLE`: the slot below is
//! `None` while idle and holds the shared pending result while refreshing.
//! Every exit path of the refresh, including a panic or timeout, empties
//! the slot again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};

use super::inspect;
use super::tokens::TokenStore;
use crate::config::Config;

pub const REFRESH_PATH: &str = "auth/refresh";

type PendingRefresh = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Rotated credentials returned by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct Inner {
    http: reqwest::Client,
    refresh_url: url::Url,
    timeout: Duration,
    store: Arc<dyn TokenStore>,
    pending: Mutex<Option<PendingRefresh>>,
}

/// Returns the coordinator to idle when the in-flight refresh finishes,
/// however it finishes.
struct ResetOnDrop(Arc<Inner>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        self.0
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }
}

/// Owns the refresh state for one process. Cheap to clone; clones share
/// the same in-flight refresh.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(http: reqwest::Client, config: &Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let refresh_url = config
            .base_url()?
            .join(REFRESH_PATH)
            .context("Failed to build refresh URL")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                refresh_url,
                timeout: config.refresh_timeout(),
                store,
                pending: Mutex::new(None),
            }),
        })
    }

    /// True while a refresh call is outstanding.
    #[cfg(test)]
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Obtain a new access token, joining the in-flight refresh if there is one.
    ///
    /// Returns `None` when there is no refresh token, when it has expired,
    /// or when the server rejects it; in the last two cases all stored
    /// credentials have been cleared.
    pub async fn refresh_token(&self) -> Option<String> {
        let pending = {
            let mut slot = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(|e| e.into_inner());

            match slot.as_ref() {
                Some(pending) => {
                    tracing::debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let pending = async move {
                        let _reset = ResetOnDrop(inner.clone());
                        inner.perform_refresh().await
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Current access token if still valid, otherwise the result of a refresh.
    pub async fn get_valid_token(&self) -> Option<String> {
        let current = self.inner.store.current_access()?;

        if !inspect::is_expired(&current) {
            return Some(current);
        }

        tracing::info!("Access token expired, attempting refresh...");
        self.refresh_token().await
    }
}

impl Inner {
    async fn perform_refresh(&self) -> Option<String> {
        let refresh_token = match self.store.get_refresh() {
            Some(token) => token,
            None => {
                tracing::warn!("No refresh token available");
                return None;
            }
        };

        if inspect::is_expired(&refresh_token) {
            tracing::warn!("Refresh token has expired");
            self.store.clear_all();
            return None;
        }

        match self.exchange(&refresh_token).await {
            Ok(pair) => {
                self.store.set_pair(&pair.access_token, &pair.refresh_token);
                tracing::info!("Tokens refreshed successfully");
                Some(pair.access_token)
            }
            Err(e) => {
                tracing::warn!("Token refresh failed: {:#}", e);
                self.store.clear_all();
                None
            }
        }
    }

    /// One round trip to the refresh endpoint.
    async fn exchange(&self, refresh_token: &str) -> Result<TokenPair> {
        tracing::debug!("POST {}", self.refresh_url);

        let resp = self
            .http
            .post(self.refresh_url.clone())
            .timeout(self.timeout)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .context("Failed to call refresh endpoint")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("HTTP {}: {}", status.as_u16(), body);
        }

        let body: RefreshResponse = resp
            .json()
            .await
            .context("Failed to parse refresh response")?;

        match (body.access_token, body.refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Ok(TokenPair {
                    access_token,
                    refresh_token,
                })
            }
            _ => bail!("Invalid token refresh response"),
        }
    }
}
