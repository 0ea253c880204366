//! Login, registration and local session management
//!
//! The login endpoint has answered in three shapes over the API's life:
//! a token pair with the user, a token pair alone, or a bare legacy token.
//! All three are accepted.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::inspect::{self, Expiry};
use super::navigator::{SessionNavigator, LOGIN_PATH, REGISTER_PATH};
use super::tokens::TokenStore;
use crate::api::client::{ApiClient, ApiRequest};
use crate::config::Config;
use crate::models::{User, UserProfile};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

/// Accepted login/register response bodies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Tokens {
        #[serde(rename = "accessToken")]
        access_token: String,
        #[serde(rename = "refreshToken")]
        refresh_token: String,
        #[serde(default)]
        user: Option<User>,
    },
    Legacy(String),
}

/// Parse a login body. A JSON string or a bare token in plain text is the
/// legacy single-token format.
pub fn parse_login_response(body: &str) -> Result<LoginResponse> {
    if let Ok(parsed) = serde_json::from_str::<LoginResponse>(body) {
        return match parsed {
            LoginResponse::Legacy(ref t) if t.trim().is_empty() => bail!("Empty token in login response"),
            other => Ok(other),
        };
    }

    let raw = body.trim();
    let looks_like_token = !raw.is_empty()
        && !raw.starts_with('{')
        && !raw.starts_with('[')
        && !raw.contains(char::is_whitespace);
    if looks_like_token {
        return Ok(LoginResponse::Legacy(raw.to_string()));
    }

    bail!("Unrecognised login response")
}

/// Persist the credentials from a login response and return the profile
/// that was cached.
pub fn store_login(store: &dyn TokenStore, response: LoginResponse, email: &str) -> UserProfile {
    let profile = match response {
        LoginResponse::Tokens {
            access_token,
            refresh_token,
            user,
        } => {
            store.set_pair(&access_token, &refresh_token);
            user.map(UserProfile::from)
                .unwrap_or_else(|| UserProfile::from_email(email))
        }
        LoginResponse::Legacy(token) => {
            tracing::debug!("Login returned a legacy single token");
            store.set_legacy(&token);
            UserProfile::from_email(email)
        }
    };

    store.set_cached_user(&profile);
    profile
}

/// Log in with email and password.
pub async fn login(
    client: &ApiClient,
    navigator: &SessionNavigator,
    email: &str,
    password: &str,
) -> Result<UserProfile> {
    navigator.navigate(LOGIN_PATH);

    let name = UserProfile::from_email(email).name;
    let req = ApiRequest::post("/auth/login").json(&LoginRequest {
        email,
        password,
        name: &name,
    })?;
    let resp = client.send_anonymous(&req).await.context("Login failed")?;
    let body = resp.text().await.context("Failed to read login response")?;

    let response = parse_login_response(&body)?;
    let profile = store_login(client.store().as_ref(), response, email);
    navigator.navigate("/boards");
    tracing::info!("Logged in as {}", profile.email);
    Ok(profile)
}

/// Create an account; the server logs the new user in directly.
pub async fn register(
    client: &ApiClient,
    navigator: &SessionNavigator,
    name: &str,
    email: &str,
    password: &str,
) -> Result<UserProfile> {
    navigator.navigate(REGISTER_PATH);

    let req = ApiRequest::post("/auth/register").json(&RegisterRequest {
        name,
        email,
        password,
    })?;
    let resp = client
        .send_anonymous(&req)
        .await
        .context("Registration failed")?;
    let body = resp.text().await.context("Failed to read register response")?;

    let response = parse_login_response(&body)?;
    let mut profile = store_login(client.store().as_ref(), response, email);
    if profile.id.is_none() && profile.name != name {
        profile.name = name.to_string();
        client.store().set_cached_user(&profile);
    }
    navigator.navigate("/boards");
    Ok(profile)
}

/// Store a token obtained from the identity provider. It has no refresh
/// counterpart, so it is used until it expires.
pub fn import_token(store: &dyn TokenStore, id_token: &str, profile: UserProfile) -> Result<()> {
    if let Expiry::Undecodable = inspect::decode_expiry(id_token) {
        bail!("Token is not a readable JWT (no exp claim)");
    }
    if inspect::is_expired(id_token) {
        bail!("Token has already expired");
    }

    store.set_access(id_token);
    store.set_cached_user(&profile);
    Ok(())
}

/// How a stored token looks right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid { expires_at_ms: i64 },
    ExpiringSoon { expires_at_ms: i64 },
    Expired { expires_at_ms: i64 },
    Unreadable,
}

pub fn token_state(token: &str, threshold_minutes: i64) -> TokenState {
    let expires_at_ms = match inspect::expires_at_millis(token) {
        Some(ms) => ms,
        None => return TokenState::Unreadable,
    };

    if inspect::is_expired(token) {
        TokenState::Expired { expires_at_ms }
    } else if inspect::is_expiring_soon(token, threshold_minutes) {
        TokenState::ExpiringSoon { expires_at_ms }
    } else {
        TokenState::Valid { expires_at_ms }
    }
}

fn format_millis(ms: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

fn describe(label: &str, token: Option<String>, threshold: i64) {
    let token = match token {
        Some(t) => t,
        None => {
            println!("{} none", label);
            return;
        }
    };

    match token_state(&token, threshold) {
        TokenState::Valid { expires_at_ms } => {
            println!("{} valid", label);
            println!("  expires_at: {}", format_millis(expires_at_ms));
        }
        TokenState::ExpiringSoon { expires_at_ms } => {
            println!("{} expiring soon", label);
            println!("  expires_at: {}", format_millis(expires_at_ms));
        }
        TokenState::Expired { expires_at_ms } => {
            println!("{} expired", label);
            println!("  expired_at: {}", format_millis(expires_at_ms));
        }
        TokenState::Unreadable => println!("{} unreadable (treated as expired)", label),
    }
}

/// Clear stored credentials
pub fn logout(store: &dyn TokenStore) {
    store.clear_all();
    println!("Logged out.");
}

/// Display current auth status
pub fn status(store: &dyn TokenStore, config: &Config) {
    let threshold = config.expiry_threshold_minutes;

    describe("Access token: ", store.get_access(), threshold);
    describe("Refresh token:", store.get_refresh(), threshold);
    if let Some(legacy) = store.get_legacy() {
        describe("Legacy token: ", Some(legacy), threshold);
    }

    match store.get_cached_user() {
        Some(user) => println!("User:          {} <{}>", user.name, user.email),
        None => println!("User:          none"),
    }

    if store.current_access().is_none() {
        println!("\nRun 'board-cli login' to authenticate.");
    }
}

/// Show the cached user, optionally refreshing it from the server.
pub async fn whoami(client: &ApiClient, remote: bool) -> Result<()> {
    let cached = client
        .store()
        .get_cached_user()
        .context("Not logged in. Run 'board-cli login' first.")?;

    let profile = if remote {
        let id = cached
            .id
            .as_deref()
            .context("No user id cached for this session; the server did not send one at login.")?;
        if client.refresher().get_valid_token().await.is_none() {
            bail!("Session expired. Run 'board-cli login'.");
        }
        let user = client.get_user(id).await?;
        let profile = UserProfile::from(user);
        client.store().set_cached_user(&profile);
        profile
    } else {
        cached
    };

    println!();
    println!("Name:  {}", profile.name);
    println!("Email: {}", profile.email);
    println!("ID:    {}", profile.id.as_deref().unwrap_or("(unknown)"));
    Ok(())
}
