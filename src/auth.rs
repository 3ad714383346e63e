use crate::backend::AuthProvider;
use crate::errors::BackendError;
use crate::models::UserId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    user_id: UserId,
}

/// Sign-in against local state: a pre-supplied custom token, or an anonymous
/// identity remembered in `identity_path`.
#[derive(Debug, Clone, Default)]
pub struct LocalAuth {
    token: Option<String>,
    identity_path: Option<PathBuf>,
}

impl LocalAuth {
    pub fn new(token: Option<String>, identity_path: Option<PathBuf>) -> Self {
        Self {
            token,
            identity_path,
        }
    }

    async fn anonymous(&self) -> Result<UserId, BackendError> {
        let Some(path) = &self.identity_path else {
            return Ok(UserId::new(uuid::Uuid::new_v4().to_string()));
        };

        match fs::read(path).await {
            Ok(bytes) => {
                let stored: StoredIdentity = serde_json::from_slice(&bytes)
                    .map_err(|err| BackendError::Auth(format!("corrupt identity file: {err}")))?;
                Ok(stored.user_id)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let stored = StoredIdentity {
                    user_id: UserId::new(uuid::Uuid::new_v4().to_string()),
                };
                fs::write(path, serde_json::to_vec_pretty(&stored)?).await?;
                info!(path = %path.display(), "created anonymous identity");
                Ok(stored.user_id)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl AuthProvider for LocalAuth {
    async fn sign_in(&self) -> Result<UserId, BackendError> {
        let user_id = match self.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => UserId::new(token),
            _ => self.anonymous().await?,
        };
        info!(user = %user_id, "signed in");
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_identity_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("habit_identity_{}_{}.json", std::process::id(), nanos));
        path
    }

    #[tokio::test]
    async fn custom_token_becomes_the_user_id() {
        let auth = LocalAuth::new(Some("  token-123 ".to_string()), None);
        assert_eq!(auth.sign_in().await.unwrap(), UserId::new("token-123"));
    }

    #[tokio::test]
    async fn anonymous_identity_is_stable_across_sign_ins() {
        let path = unique_identity_path();
        let auth = LocalAuth::new(Some("   ".to_string()), Some(path.clone()));
        let first = auth.sign_in().await.unwrap();
        let second = auth.sign_in().await.unwrap();
        assert_eq!(first, second);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn corrupt_identity_file_fails_sign_in() {
        let path = unique_identity_path();
        std::fs::write(&path, b"not json").unwrap();
        let auth = LocalAuth::new(None, Some(path.clone()));
        assert!(matches!(auth.sign_in().await, Err(BackendError::Auth(_))));
        let _ = std::fs::remove_file(&path);
    }
}
