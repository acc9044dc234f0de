//! Session capability: the seam between the panels and the account
//! service that owns sign-in state and profile updates.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::UserProfile;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no active session")]
    NoSession,
    #[error("update rejected: {0}")]
    Rejected(String),
    #[error("malformed session file: {0}")]
    Malformed(String),
    #[error("session store I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// What the panels need from the account service. The app owns no
/// session state of its own; it reads and writes through this trait.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The signed-in user, or `None` when nobody is signed in.
    async fn current_user(&self) -> Option<UserProfile>;

    /// Push edited profile fields upstream. `photo_url: None` clears the
    /// stored photo.
    async fn update_profile(&self, name: &str, photo_url: Option<&str>) -> SessionResult<()>;
}

/// On-disk session record, the shape the account service hands out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    pub user: UserProfile,
}

/// Session provider backed by a TOML session file on disk.
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("kigen").join("session.toml"))
    }

    fn read(&self) -> SessionResult<SessionFile> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SessionError::NoSession
            } else {
                SessionError::Io(e)
            }
        })?;
        toml::from_str(&content).map_err(|e| SessionError::Malformed(e.to_string()))
    }

    fn write(&self, session: &SessionFile) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(session).map_err(|e| SessionError::Malformed(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for FileSession {
    async fn current_user(&self) -> Option<UserProfile> {
        match self.read() {
            Ok(session) => Some(session.user),
            Err(SessionError::NoSession) => None,
            Err(e) => {
                tracing::warn!("Could not read session file: {}", e);
                None
            }
        }
    }

    async fn update_profile(&self, name: &str, photo_url: Option<&str>) -> SessionResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::Rejected("name must not be empty".to_string()));
        }

        let mut session = self.read()?;
        session.user.name = name.to_string();
        session.user.photo_url = photo_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        self.write(&session)?;

        tracing::info!("Profile updated for {}", session.user.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Role;

    fn temp_session(tag: &str) -> FileSession {
        let path = std::env::temp_dir().join(format!(
            "kigen-session-{}-{}.toml",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        FileSession::new(path)
    }

    fn seed(session: &FileSession, name: &str) {
        session
            .write(&SessionFile {
                user: UserProfile {
                    name: name.to_string(),
                    email: "alice@example.com".to_string(),
                    photo_url: Some("https://cdn.example.com/a.png".to_string()),
                    role: Role::Admin,
                    created_at: None,
                },
            })
            .unwrap();
    }

    #[tokio::test]
    async fn missing_file_means_signed_out() {
        let session = temp_session("missing");
        assert!(session.current_user().await.is_none());
    }

    #[tokio::test]
    async fn update_without_session_is_rejected() {
        let session = temp_session("no-session");
        let err = session.update_profile("Alice", None).await.unwrap_err();
        assert!(matches!(err, SessionError::NoSession));
    }

    #[tokio::test]
    async fn update_rewrites_name_and_photo() {
        let session = temp_session("update");
        seed(&session, "Alice");

        session
            .update_profile(" Alicia ", Some("https://cdn.example.com/new.png"))
            .await
            .unwrap();

        let user = session.current_user().await.unwrap();
        assert_eq!(user.name, "Alicia");
        assert_eq!(
            user.photo_url.as_deref(),
            Some("https://cdn.example.com/new.png")
        );
        assert_eq!(user.role, Role::Admin, "untouched fields survive");

        let _ = std::fs::remove_file(&session.path);
    }

    #[tokio::test]
    async fn blank_photo_clears_the_stored_one() {
        let session = temp_session("clear-photo");
        seed(&session, "Alice");

        session.update_profile("Alice", None).await.unwrap();
        assert_eq!(session.current_user().await.unwrap().photo_url, None);

        let _ = std::fs::remove_file(&session.path);
    }

    #[tokio::test]
    async fn empty_name_is_rejected_before_any_write() {
        let session = temp_session("empty-name");
        seed(&session, "Alice");

        let err = session.update_profile("   ", None).await.unwrap_err();
        assert!(matches!(err, SessionError::Rejected(_)));
        assert_eq!(session.current_user().await.unwrap().name, "Alice");

        let _ = std::fs::remove_file(&session.path);
    }

    #[tokio::test]
    async fn malformed_file_reads_as_signed_out() {
        let session = temp_session("malformed");
        std::fs::write(&session.path, "not even toml {{{").unwrap();

        assert!(session.current_user().await.is_none());
        assert!(matches!(session.read(), Err(SessionError::Malformed(_))));

        let _ = std::fs::remove_file(&session.path);
    }
}
