//! Authenticated HTTP client for the task-board API
//!
//! Wraps reqwest::Client with bearer token injection, refresh before send
//! when the cached token has expired, and a single replay after a 401.

use std::sync::Arc;

use anyhow::Context;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::Instrument;

use crate::auth::inspect;
use crate::auth::navigator::{Navigator, SessionNavigator};
use crate::auth::refresh::RefreshCoordinator;
use crate::auth::tokens::{self, TokenStore};
use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("401 Unauthorized for {url}: {body}")]
    Unauthorized { url: String, body: String },

    #[error("HTTP {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid request path {path}")]
    InvalidPath {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to encode request body")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// One logical API call. Replays rebuild the HTTP request from this, so
/// nothing about a previous attempt leaks into the next one.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

/// Which try of a logical call this is. A replay gets a fresh value; the
/// request itself is never stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attempt(u8);

impl Attempt {
    const FIRST: Attempt = Attempt(0);

    fn replay(self) -> Attempt {
        Attempt(self.0 + 1)
    }

    fn is_replay(self) -> bool {
        self.0 > 0
    }
}

/// What to do after the server answered 401.
enum Recovery {
    Replay(String),
    GiveUp,
}

/// Authenticated client shared by every board, list, card and user call.
pub struct ApiClient {
    http: reqwest::Client,
    base: url::Url,
    store: Arc<dyn TokenStore>,
    refresher: RefreshCoordinator,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        config: &Config,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        let refresher = RefreshCoordinator::new(http.clone(), config, store.clone())?;

        Ok(Self {
            http,
            base: config.base_url()?,
            store,
            refresher,
            navigator,
        })
    }

    /// Client over the user's config and credentials file.
    pub fn from_env(navigator: Arc<SessionNavigator>) -> anyhow::Result<Self> {
        let config = Config::load()?;
        let store: Arc<dyn TokenStore> = Arc::from(tokens::default_store());
        Self::new(&config, store, navigator)
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    fn url_for(&self, req: &ApiRequest) -> Result<url::Url, ApiError> {
        let relative = req.path.trim_start_matches('/');
        let mut url = self
            .base
            .join(relative)
            .map_err(|source| ApiError::InvalidPath {
                path: req.path.clone(),
                source,
            })?;
        if !req.query.is_empty() {
            url.query_pairs_mut().extend_pairs(req.query.iter());
        }
        Ok(url)
    }

    /// Send `req` with credentials, recovering once from a 401.
    pub async fn send(&self, req: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let span = tracing::debug_span!("api", id = %request_id(), method = %req.method, path = %req.path);
        self.send_authenticated(req).instrument(span).await
    }

    /// Send `req` without credentials and without refresh handling
    /// (login and registration).
    pub async fn send_anonymous(&self, req: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url_for(req)?;
        let resp = self.dispatch(req, &url, None).await?;
        check_response(resp, &url).await
    }

    async fn send_authenticated(&self, req: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let url = self.url_for(req)?;
        let mut attempt = Attempt::FIRST;
        let mut token = self.token_for_send().await;

        loop {
            let resp = self.dispatch(req, &url, token.as_deref()).await?;
            if resp.status() != StatusCode::UNAUTHORIZED {
                return check_response(resp, &url).await;
            }

            match self.recover_from_unauthorized(&url, attempt).await {
                Recovery::Replay(new_token) => {
                    tracing::debug!("Replaying {} {} with refreshed token", req.method, url);
                    attempt = attempt.replay();
                    token = Some(new_token);
                }
                Recovery::GiveUp => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(ApiError::Unauthorized {
                        url: url.to_string(),
                        body,
                    });
                }
            }
        }
    }

    /// Bearer token to attach before sending, refreshing an expired one.
    async fn token_for_send(&self) -> Option<String> {
        let token = self.store.current_access()?;
        if !inspect::is_expired(&token) {
            return Some(token);
        }

        tracing::warn!("Token expired, attempting refresh...");
        match self.refresher.refresh_token().await {
            Some(fresh) => Some(fresh),
            None => {
                // let the server reject the call
                self.store.clear_all();
                None
            }
        }
    }

    async fn recover_from_unauthorized(&self, url: &url::Url, attempt: Attempt) -> Recovery {
        if attempt.is_replay() {
            tracing::debug!("Replay was rejected too; giving up");
            return Recovery::GiveUp;
        }
        if is_auth_endpoint(url) || self.navigator.on_auth_view() {
            return Recovery::GiveUp;
        }

        match self.refresher.refresh_token().await {
            Some(token) => Recovery::Replay(token),
            None => {
                self.store.clear_all();
                self.navigator.redirect_to_login();
                Recovery::GiveUp
            }
        }
    }

    async fn dispatch(
        &self,
        req: &ApiRequest,
        url: &url::Url,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::debug!("{} {}", req.method, url);

        let mut builder = self.http.request(req.method.clone(), url.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })
    }

    /// Send and decode a JSON response body.
    pub async fn fetch<T: DeserializeOwned>(&self, req: &ApiRequest) -> Result<T, ApiError> {
        let resp = self.send(req).await?;
        let url = resp.url().to_string();
        resp.json()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    /// Send and return the (usually plain-text) response body.
    pub async fn fetch_text(&self, req: &ApiRequest) -> Result<String, ApiError> {
        let resp = self.send(req).await?;
        let url = resp.url().to_string();
        resp.text()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }
}

fn request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Requests to `/auth/...` never trigger a refresh.
fn is_auth_endpoint(url: &url::Url) -> bool {
    url.path().contains("/auth/")
}

/// Turn a non-success status into an error carrying the body.
async fn check_response(resp: reqwest::Response, url: &url::Url) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Unauthorized {
            url: url.to_string(),
            body,
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        });
    }
    Ok(resp)
}
