//! Token storage
//!
//! Credentials live in a small TOML file next to the config. Every mutation
//! happens under one lock and is persisted with a single atomic file
//! replace, so a reader never sees a half-cleared session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Config;
use crate::models::UserProfile;

/// On-disk credential record. Field names match the storage keys.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Rotating access token
    #[serde(rename = "token", skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Cached user profile (JSON stored as string, as the web client did)
    #[serde(rename = "user", skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Single non-rotating token from the legacy login format
    #[serde(rename = "jwt", skip_serializing_if = "Option::is_none")]
    pub legacy_token: Option<String>,
}

/// Token store trait for different storage backends.
///
/// All operations are synchronous. Setters cannot fail from the caller's
/// point of view: a backend that cannot persist logs and carries on.
pub trait TokenStore: Send + Sync {
    fn get_access(&self) -> Option<String>;
    fn get_refresh(&self) -> Option<String>;
    fn get_legacy(&self) -> Option<String>;
    fn get_cached_user(&self) -> Option<UserProfile>;

    /// Store a rotating pair, replacing any legacy token.
    fn set_pair(&self, access: &str, refresh: &str);
    /// Store a token that has no refresh counterpart (legacy login).
    fn set_legacy(&self, token: &str);
    /// Store an access token on its own (identity-provider token).
    fn set_access(&self, token: &str);
    fn set_cached_user(&self, profile: &UserProfile);

    /// Remove access, refresh, legacy token and cached user in one step.
    fn clear_all(&self);

    /// Token to present as bearer credential: the rotating access token,
    /// falling back to the legacy single token.
    fn current_access(&self) -> Option<String> {
        self.get_access().or_else(|| self.get_legacy())
    }
}

/// File-backed store. With no path it keeps everything in memory.
pub struct FileTokenStore {
    path: Option<PathBuf>,
    creds: Mutex<Credentials>,
}

impl FileTokenStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let creds = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read credentials file")?;
            toml::from_str(&content).context("Failed to parse credentials file")?
        } else {
            Credentials::default()
        };

        Ok(Self {
            path: Some(path),
            creds: Mutex::new(creds),
        })
    }

    /// Store that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            creds: Mutex::new(Credentials::default()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Credentials) -> T) -> T {
        let guard = self.creds.lock().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Apply `f` and persist while still holding the lock.
    fn update(&self, f: impl FnOnce(&mut Credentials)) {
        let mut guard = self.creds.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard);
        if let Some(ref path) = self.path {
            if let Err(e) = persist(path, &guard) {
                tracing::warn!("Failed to save credentials: {:#}", e);
            }
        }
    }
}

/// Write to a sibling temp file then rename over the target.
fn persist(path: &Path, creds: &Credentials) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create credentials directory")?;
    }

    let content = toml::to_string_pretty(creds).context("Failed to serialize credentials")?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, content).context("Failed to write credentials file")?;

    // Restrictive permissions: the file holds bearer tokens
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp, perms).context("Failed to set credentials permissions")?;
    }

    fs::rename(&tmp, path).context("Failed to replace credentials file")?;
    Ok(())
}

impl TokenStore for FileTokenStore {
    fn get_access(&self) -> Option<String> {
        self.read(|c| c.access_token.clone())
    }

    fn get_refresh(&self) -> Option<String> {
        self.read(|c| c.refresh_token.clone())
    }

    fn get_legacy(&self) -> Option<String> {
        self.read(|c| c.legacy_token.clone())
    }

    fn get_cached_user(&self) -> Option<UserProfile> {
        self.read(|c| c.user.as_deref().and_then(|s| serde_json::from_str(s).ok()))
    }

    fn set_pair(&self, access: &str, refresh: &str) {
        self.update(|c| {
            c.access_token = Some(access.to_string());
            c.refresh_token = Some(refresh.to_string());
            c.legacy_token = None;
        });
    }

    fn set_legacy(&self, token: &str) {
        self.update(|c| {
            c.legacy_token = Some(token.to_string());
            c.access_token = None;
            c.refresh_token = None;
        });
    }

    fn set_access(&self, token: &str) {
        self.update(|c| {
            c.access_token = Some(token.to_string());
            c.refresh_token = None;
            c.legacy_token = None;
        });
    }

    fn set_cached_user(&self, profile: &UserProfile) {
        match serde_json::to_string(profile) {
            Ok(json) => self.update(|c| c.user = Some(json)),
            Err(e) => tracing::warn!("Failed to encode cached user: {}", e),
        }
    }

    fn clear_all(&self) {
        self.update(|c| *c = Credentials::default());
    }
}

/// Used when no persistent location is available: nothing is remembered.
pub struct DetachedTokenStore;

impl TokenStore for DetachedTokenStore {
    fn get_access(&self) -> Option<String> {
        None
    }

    fn get_refresh(&self) -> Option<String> {
        None
    }

    fn get_legacy(&self) -> Option<String> {
        None
    }

    fn get_cached_user(&self) -> Option<UserProfile> {
        None
    }

    fn set_pair(&self, _access: &str, _refresh: &str) {}

    fn set_legacy(&self, _token: &str) {}

    fn set_access(&self, _token: &str) {}

    fn set_cached_user(&self, _profile: &UserProfile) {}

    fn clear_all(&self) {}
}

/// Store at the standard credentials path, or a detached store if the
/// platform has no config directory or the file is unreadable.
pub fn default_store() -> Box<dyn TokenStore> {
    let opened = Config::credentials_path().and_then(|path| FileTokenStore::open(path));
    match opened {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("Credential storage unavailable: {:#}", e);
            Box::new(DetachedTokenStore)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: Some("user_1".into()),
            name: "ada".into(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn test_pair_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        let store = FileTokenStore::open(&path).unwrap();
        store.set_pair("a1", "r1");
        store.set_cached_user(&profile());

        let reopened = FileTokenStore::open(&path).unwrap();
        assert_eq!(reopened.get_access().as_deref(), Some("a1"));
        assert_eq!(reopened.get_refresh().as_deref(), Some("r1"));
        assert_eq!(reopened.get_cached_user(), Some(profile()));
    }

    #[test]
    fn test_storage_keys_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        let store = FileTokenStore::open(&path).unwrap();
        store.set_pair("a1", "r1");

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("token = \"a1\""), "{}", raw);
        assert!(raw.contains("refreshToken = \"r1\""), "{}", raw);
    }

    #[test]
    fn test_clear_all_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");

        let store = FileTokenStore::open(&path).unwrap();
        store.set_pair("a1", "r1");
        store.set_cached_user(&profile());
        store.clear_all();

        assert!(store.get_access().is_none());
        assert!(store.get_refresh().is_none());
        assert!(store.get_cached_user().is_none());

        let reopened = FileTokenStore::open(&path).unwrap();
        assert!(reopened.get_access().is_none());
        assert!(reopened.get_refresh().is_none());
        assert!(reopened.get_legacy().is_none());
    }

    #[test]
    fn test_clear_all_is_never_observed_half_done() {
        let store = std::sync::Arc::new(FileTokenStore::in_memory());
        store.set_pair("a1", "r1");

        let reader = {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    let both = store.read(|c| (c.access_token.is_some(), c.refresh_token.is_some()));
                    assert!(both.0 == both.1, "observed partial clear: {:?}", both);
                }
            })
        };

        for i in 0..1_000 {
            store.clear_all();
            store.set_pair(&format!("a{}", i), &format!("r{}", i));
        }
        reader.join().unwrap();
    }

    #[test]
    fn test_legacy_and_pair_are_exclusive() {
        let store = FileTokenStore::in_memory();
        store.set_legacy("jwt-abc");
        assert_eq!(store.current_access().as_deref(), Some("jwt-abc"));
        assert!(store.get_refresh().is_none());

        store.set_pair("a2", "r2");
        assert!(store.get_legacy().is_none());
        assert_eq!(store.current_access().as_deref(), Some("a2"));
    }

    #[test]
    fn test_unparseable_cached_user_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        fs::write(&path, "user = \"{not json\"\n").unwrap();

        let store = FileTokenStore::open(&path).unwrap();
        assert!(store.get_cached_user().is_none());
    }

    #[test]
    fn test_detached_store_forgets() {
        let store = DetachedTokenStore;
        store.set_pair("a1", "r1");
        store.set_cached_user(&profile());
        assert!(store.get_access().is_none());
        assert!(store.get_refresh().is_none());
        assert!(store.current_access().is_none());
        assert!(store.get_cached_user().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_credentials_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.toml");
        FileTokenStore::open(&path).unwrap().set_pair("a", "r");

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
