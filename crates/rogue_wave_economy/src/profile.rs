//! # Profile Store
//!
//! One pretty-printed JSON file per profile, `<name>.profileData`, under
//! `<user data dir>/RogueWave/Profiles` or an explicit root.
//!
//! Files are read and written in full. Saves go to a temporary file first
//! and are renamed into place, so a crash mid-save leaves the previous
//! profile intact.

use std::path::{Path, PathBuf};

use crate::data::PersistentData;
use crate::error::{EconomyError, EconomyResult};

/// Profile file extension.
pub const PROFILE_EXTENSION: &str = "profileData";

/// Application directory under the user data dir.
pub const APP_DIR: &str = "RogueWave";

/// Profile directory under the application directory.
pub const PROFILE_DIR: &str = "Profiles";

/// Directory of profile files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// A store rooted at `root`. The directory is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The per-user default store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the platform has no user data directory.
    pub fn user_default() -> EconomyResult<Self> {
        let base = dirs::data_local_dir().ok_or_else(|| {
            EconomyError::InvalidConfig("no user data directory on this platform".to_string())
        })?;
        Ok(Self::new(base.join(APP_DIR).join(PROFILE_DIR)))
    }

    /// Directory holding the profile files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a profile.
    ///
    /// # Errors
    ///
    /// Returns `InvalidProfileName` for empty names, path separators or
    /// relative path components.
    pub fn path_for(&self, name: &str) -> EconomyResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}.{PROFILE_EXTENSION}")))
    }

    /// True when a profile file exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|p| p.is_file())
    }

    /// Reads a profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` when there is no file, `Io` on read
    /// failure and `Parse` on malformed JSON.
    pub fn load(&self, name: &str) -> EconomyResult<PersistentData> {
        let path = self.path_for(name)?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EconomyError::ProfileNotFound(name.to_string()));
            }
            Err(e) => return Err(EconomyError::io(&path, &e)),
        };

        let data: PersistentData = serde_json::from_str(&text).map_err(|e| EconomyError::Parse {
            source_name: path.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::info!("Loaded profile {:?} from {}", name, path.display());
        Ok(data)
    }

    /// Writes a profile in full.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the directory or file cannot be written.
    pub fn save(&self, name: &str, data: &PersistentData) -> EconomyResult<()> {
        let path = self.path_for(name)?;
        std::fs::create_dir_all(&self.root).map_err(|e| EconomyError::io(&self.root, &e))?;

        let json = serde_json::to_string_pretty(data).map_err(|e| EconomyError::Parse {
            source_name: name.to_string(),
            message: e.to_string(),
        })?;

        let temp = path.with_extension(format!("{PROFILE_EXTENSION}.tmp"));
        std::fs::write(&temp, json).map_err(|e| EconomyError::io(&temp, &e))?;
        std::fs::rename(&temp, &path).map_err(|e| EconomyError::io(&path, &e))?;

        tracing::info!("Saved profile {:?} to {}", name, path.display());
        Ok(())
    }

    /// Names of every stored profile, sorted.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the directory exists but cannot be read.
    pub fn list(&self) -> EconomyResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EconomyError::io(&self.root, &e)),
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Deletes a profile. Returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the file exists but cannot be removed.
    pub fn delete(&self, name: &str) -> EconomyResult<bool> {
        let path = self.path_for(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Deleted profile {:?}", name);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(EconomyError::io(&path, &e)),
        }
    }
}

fn validate_name(name: &str) -> EconomyResult<()> {
    let bad = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0'));
    if bad {
        return Err(EconomyError::InvalidProfileName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> ProfileStore {
        ProfileStore::new(std::env::temp_dir().join(format!("rogue_wave_profiles_{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_name_validation() {
        let store = temp_store();
        assert!(store.path_for("Player One").is_ok());
        for bad in ["", "  ", "..", "a/b", "a\\b"] {
            assert_eq!(
                store.path_for(bad).unwrap_err(),
                EconomyError::InvalidProfileName(bad.to_string())
            );
        }
    }

    #[test]
    fn test_missing_profile() {
        let store = temp_store();
        assert_eq!(store.load("ghost").unwrap_err(), EconomyError::ProfileNotFound("ghost".into()));
        assert!(store.list().unwrap().is_empty());
        assert!(!store.delete("ghost").unwrap());
    }

    #[test]
    fn test_save_list_delete() {
        let store = temp_store();
        let data = PersistentData::default();
        store.save("beta", &data).unwrap();
        store.save("alpha", &data).unwrap();
        assert!(store.exists("alpha"));
        assert_eq!(store.list().unwrap(), vec!["alpha".to_string(), "beta".to_string()]);

        assert!(store.delete("alpha").unwrap());
        assert_eq!(store.list().unwrap(), vec!["beta".to_string()]);
        std::fs::remove_dir_all(store.root()).unwrap();
    }

    #[test]
    fn test_corrupt_profile_is_a_parse_error() {
        let store = temp_store();
        std::fs::create_dir_all(store.root()).unwrap();
        std::fs::write(store.path_for("broken").unwrap(), "{ not json").unwrap();
        assert!(matches!(store.load("broken"), Err(EconomyError::Parse { .. })));
        std::fs::remove_dir_all(store.root()).unwrap();
    }
}
