//! The persisted "current user".
//!
//! This is the only state that outlives the process: one JSON record under
//! a fixed key inside the state directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::Actor;
use crate::error::{Result, SigndeskError};

/// Storage key of the current-user record.
pub const CURRENT_USER_KEY: &str = "current_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl CurrentUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            email: None,
            role: None,
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id.clone(), self.name.clone())
    }
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", CURRENT_USER_KEY))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The stored user, or `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<CurrentUser>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Like [`load`](Self::load) but fails when nobody is logged in.
    pub fn require(&self) -> Result<CurrentUser> {
        self.load()?.ok_or(SigndeskError::NotLoggedIn)
    }

    pub fn save(&self, user: &CurrentUser) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(), serde_json::to_string_pretty(user)?)?;
        Ok(())
    }

    /// Remove the stored user. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        let path = self.path();
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_session() {
        let tmp = TempDir::new().unwrap();
        let session = SessionStore::new(tmp.path().join(".signdesk"));
        assert!(session.load().unwrap().is_none());
        assert!(matches!(session.require(), Err(SigndeskError::NotLoggedIn)));
    }

    #[test]
    fn test_save_load_clear() {
        let tmp = TempDir::new().unwrap();
        let session = SessionStore::new(tmp.path().join(".signdesk"));

        let mut user = CurrentUser::new("Ines Duarte");
        user.role = Some("Checker".to_string());
        session.save(&user).unwrap();

        assert!(tmp.path().join(".signdesk/current_user.json").exists());
        assert_eq!(session.load().unwrap(), Some(user.clone()));
        assert_eq!(session.require().unwrap().actor().name, "Ines Duarte");

        assert!(session.clear().unwrap());
        assert!(!session.clear().unwrap());
        assert!(session.load().unwrap().is_none());
    }
}
