//! Session acquisition: username/password login or refresh-token renewal.
//!
//! The refresh token lives in a plain text file next to the cache. Any
//! failure while refreshing removes it so the next run logs in from scratch.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::error::SourceError;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token for the current run.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) bearer: String,
}

impl Session {
    pub fn bearer(&self) -> &str {
        &self.bearer
    }
}

#[derive(Serialize)]
struct LoginReq<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshReq<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResp {
    token: TokenPair,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    session: String,
    #[serde(default)]
    refresh: Option<String>,
}

pub struct SessionManager<'a> {
    client: &'a Client,
    api_url: &'a str,
    token_path: PathBuf,
}

impl<'a> SessionManager<'a> {
    pub fn new(client: &'a Client, api_url: &'a str, token_path: impl AsRef<Path>) -> Self {
        Self {
            client,
            api_url,
            token_path: token_path.as_ref().to_path_buf(),
        }
    }

    /// Refresh if a token file exists, otherwise log in.
    pub async fn establish(&self, creds: &Credentials) -> Result<Session, SourceError> {
        match fs::read_to_string(&self.token_path) {
            Ok(refresh) if !refresh.trim().is_empty() => {
                match self.refresh(refresh.trim()).await {
                    Ok(s) => Ok(s),
                    Err(e) => {
                        self.invalidate();
                        Err(e)
                    }
                }
            }
            _ => self.login(creds).await,
        }
    }

    /// Forget the stored refresh token.
    pub fn invalidate(&self) {
        match fs::remove_file(&self.token_path) {
            Ok(()) => warn!(target: "session", path = %self.token_path.display(), "stored session invalidated"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(target: "session", error = %e, "could not remove token file"),
        }
    }

    async fn login(&self, creds: &Credentials) -> Result<Session, SourceError> {
        let url = format!("{}/auth/login", self.api_url);
        let resp = self
            .client
            .post(&url)
            .json(&LoginReq {
                username: &creds.username,
                password: &creds.password,
            })
            .send()
            .await
            .map_err(|e| SourceError::Auth(format!("login request failed: {e}")))?;
        let pair = read_token(resp, "login").await?;
        if let Some(refresh) = &pair.refresh {
            self.store(refresh);
        }
        info!(target: "session", user = %creds.username, "logged in");
        Ok(Session {
            bearer: pair.session,
        })
    }

    async fn refresh(&self, token: &str) -> Result<Session, SourceError> {
        let url = format!("{}/auth/refresh", self.api_url);
        let resp = self
            .client
            .post(&url)
            .json(&RefreshReq { token })
            .send()
            .await
            .map_err(|e| SourceError::Auth(format!("refresh request failed: {e}")))?;
        let pair = read_token(resp, "refresh").await?;
        if let Some(refresh) = &pair.refresh {
            self.store(refresh);
        }
        info!(target: "session", "session refreshed");
        Ok(Session {
            bearer: pair.session,
        })
    }

    fn store(&self, refresh: &str) {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }
        if let Err(e) = fs::write(&self.token_path, refresh) {
            warn!(target: "session", error = %e, "could not persist refresh token");
        }
    }
}

async fn read_token(resp: reqwest::Response, what: &str) -> Result<TokenPair, SourceError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::Auth(format!("{what} rejected with {status}")));
    }
    if !status.is_success() {
        return Err(SourceError::Auth(format!("{what} returned {status}")));
    }
    let body: TokenResp = resp
        .json()
        .await
        .map_err(|e| SourceError::Auth(format!("{what} response unreadable: {e}")))?;
    Ok(body.token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_decodes() {
        let json = r#"{"result":"ok","token":{"session":"s-123","refresh":"r-456"}}"#;
        let t: TokenResp = serde_json::from_str(json).unwrap();
        assert_eq!(t.token.session, "s-123");
        assert_eq!(t.token.refresh.as_deref(), Some("r-456"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let c = Credentials {
            username: "reader".into(),
            password: "hunter2".into(),
        };
        let s = format!("{c:?}");
        assert!(s.contains("reader"));
        assert!(!s.contains("hunter2"));
    }

    #[test]
    fn invalidate_removes_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        fs::write(&path, "r-1").unwrap();
        let client = Client::new();
        let mgr = SessionManager::new(&client, "http://127.0.0.1:9", &path);
        mgr.invalidate();
        assert!(!path.exists());
        // Second call is a quiet no-op.
        mgr.invalidate();
    }

    #[tokio::test]
    async fn failed_refresh_invalidates_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        fs::write(&path, "r-1").unwrap();
        let client = Client::new();
        // Port 9 (discard) on localhost: connection refused.
        let mgr = SessionManager::new(&client, "http://127.0.0.1:9", &path);
        let creds = Credentials {
            username: "u".into(),
            password: "p".into(),
        };
        let err = mgr.establish(&creds).await.unwrap_err();
        assert!(err.is_auth());
        assert!(!path.exists());
    }
}
