//! The shared remote-target file.
//!
//! POS installs on the same host read the remote target from an INI file:
//!
//! ```ini
//! [mongo]
//! mongo_uri = mongodb://...
//! mongo_db = mahilmart_pos
//! mongo_collection = license_keys
//! ```
//!
//! A missing file or section is not an error; it just contributes nothing.
//! Values are kept verbatim: no quote stripping and no backslash escapes,
//! so the file reads the same here as it does on the POS side.

use std::path::{Path, PathBuf};

use ini::{EscapePolicy, Ini, ParseOption};
use license_manager_core::RemoteTarget;
use thiserror::Error;

const SECTION: &str = "mongo";
const KEY_URI: &str = "mongo_uri";
const KEY_DB: &str = "mongo_db";
const KEY_COLLECTION: &str = "mongo_collection";

fn verbatim() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..Default::default()
    }
}

/// Errors reading or writing the shared file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read shared config {path}: {source}")]
    Read { path: PathBuf, source: ini::Error },

    #[error("failed to write shared config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Handle on the shared INI file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedConfigFile {
    path: PathBuf,
}

impl SharedConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the `[mongo]` section.
    ///
    /// Returns `Ok(None)` when the file or the section does not exist.
    /// Values are trimmed; absent keys read as empty.
    pub fn read(&self) -> Result<Option<RemoteTarget>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let conf =
            Ini::load_from_file_opt(&self.path, verbatim()).map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;

        Ok(conf.section(Some(SECTION)).map(|section| {
            RemoteTarget::new(
                section.get(KEY_URI).unwrap_or_default(),
                section.get(KEY_DB).unwrap_or_default(),
                section.get(KEY_COLLECTION).unwrap_or_default(),
            )
        }))
    }

    /// Overwrite the file with `target`, creating parent directories.
    pub fn write(&self, target: &RemoteTarget) -> Result<(), ConfigError> {
        let io_err = |source: std::io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut conf = Ini::new();
        conf.with_section(Some(SECTION))
            .set(KEY_URI, target.uri.trim())
            .set(KEY_DB, target.database.trim())
            .set(KEY_COLLECTION, target.collection.trim());
        conf.write_to_file_policy(&self.path, EscapePolicy::Nothing)
            .map_err(io_err)?;

        tracing::info!(path = %self.path.display(), "updated shared remote config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = SharedConfigFile::new(dir.path().join("absent.ini"));
        assert!(file.read().unwrap().is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let file = SharedConfigFile::new(dir.path().join("MahilMartPOS").join("mongo.ini"));

        file.write(&RemoteTarget::new(" mongodb://host ", "pos", "keys")).unwrap();
        let target = file.read().unwrap().unwrap();

        assert_eq!(target.uri, "mongodb://host");
        assert_eq!(target.database, "pos");
        assert_eq!(target.collection, "keys");
    }

    #[test]
    fn test_partial_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongo.ini");
        std::fs::write(&path, "[mongo]\nmongo_db = only_db\n").unwrap();

        let target = SharedConfigFile::new(&path).read().unwrap().unwrap();
        assert_eq!(target.uri, "");
        assert_eq!(target.database, "only_db");
        assert_eq!(target.collection, "");
    }

    #[test]
    fn test_values_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongo.ini");
        std::fs::write(
            &path,
            "[mongo]\nmongo_uri = mongodb://u:p;w#d@h/?a=b\\c\nmongo_db = \"pos\"\n",
        )
        .unwrap();

        let target = SharedConfigFile::new(&path).read().unwrap().unwrap();
        assert_eq!(target.uri, r"mongodb://u:p;w#d@h/?a=b\c");
        assert_eq!(target.database, "\"pos\"");
    }

    #[test]
    fn test_backslash_survives_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongo.ini");
        let file = SharedConfigFile::new(&path);

        file.write(&RemoteTarget::new(r"mongodb://h/?tls=C:\certs\ca.pem", "pos", "keys"))
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r"tls=C:\certs\ca.pem"), "{raw}");
        assert_eq!(
            file.read().unwrap().unwrap().uri,
            r"mongodb://h/?tls=C:\certs\ca.pem"
        );
    }

    #[test]
    fn test_other_sections_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mongo.ini");
        std::fs::write(&path, "[printer]\nname = thermal\n").unwrap();

        assert!(SharedConfigFile::new(&path).read().unwrap().is_none());
    }
}
