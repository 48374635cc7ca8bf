//! Service settings.
//!
//! Priority (highest to lowest):
//! 1. Environment variables (`LICENSE_MANAGER_*`)
//! 2. The older `MAHILMARTPOS_*` names, still set by POS installs on the
//!    same host (see [`legacy_name`])
//! 3. Built-in defaults
//!
//! The remote target resolved here is only the compiled-in base layer; the
//! shared config file and the persisted override row are layered on top by
//! [`RemoteConfigProvider`](crate::config::RemoteConfigProvider).

use std::path::PathBuf;
use std::time::Duration;

use license_manager_core::{DerivationPolicy, RemoteTarget, SeedMode, ValidityWindow, DEFAULT_SOURCE};

use crate::env::Env;

pub const ENV_EMAIL: &str = "LICENSE_MANAGER_EMAIL";
pub const ENV_SOURCE: &str = "LICENSE_MANAGER_SOURCE";
pub const ENV_VALIDITY_MINUTES: &str = "LICENSE_MANAGER_KEY_VALIDITY_MINUTES";
pub const ENV_SEED_MODE: &str = "LICENSE_MANAGER_KEY_SEED_MODE";
pub const ENV_MONGO_URI: &str = "LICENSE_MANAGER_MONGO_URI";
pub const ENV_MONGO_DB: &str = "LICENSE_MANAGER_MONGO_DB";
pub const ENV_MONGO_COLLECTION: &str = "LICENSE_MANAGER_MONGO_COLLECTION";
pub const ENV_REMOTE_TIMEOUT_SECS: &str = "LICENSE_MANAGER_REMOTE_TIMEOUT_SECS";
pub const ENV_SHARED_CONFIG_PATH: &str = "LICENSE_MANAGER_SHARED_MONGO_CONFIG_PATH";
pub const ENV_DB_PATH: &str = "LICENSE_MANAGER_DB_PATH";

/// The pre-rename variable each setting was read from.
pub fn legacy_name(name: &str) -> Option<&'static str> {
    Some(match name {
        ENV_EMAIL => "MAHILMARTPOS_LICENSE_EMAIL",
        ENV_SOURCE => "MAHILMARTPOS_LICENSE_SOURCE",
        ENV_VALIDITY_MINUTES => "MAHILMARTPOS_LICENSE_KEY_VALIDITY_MINUTES",
        ENV_SEED_MODE => "MAHILMARTPOS_LICENSE_KEY_SEED_MODE",
        ENV_MONGO_URI => "MAHILMARTPOS_LICENSE_MONGO_URI",
        ENV_MONGO_DB => "MAHILMARTPOS_LICENSE_MONGO_DB",
        ENV_MONGO_COLLECTION => "MAHILMARTPOS_LICENSE_MONGO_COLLECTION",
        ENV_SHARED_CONFIG_PATH => "MAHILMARTPOS_SHARED_MONGO_CONFIG_PATH",
        ENV_DB_PATH => "MAHILMART_LICENSE_DB_PATH",
        _ => return None,
    })
}

/// Non-empty value of `name`, falling back to its legacy name.
fn lookup(env: &Env, name: &str) -> Option<String> {
    env.non_empty(name)
        .or_else(|| legacy_name(name).and_then(|legacy| env.non_empty(legacy)))
}

pub const DEFAULT_LICENSE_EMAIL: &str = "mahiltechlab.ops@gmail.com";
pub const DEFAULT_MONGO_DB: &str = "mahilmart_pos";
pub const DEFAULT_MONGO_COLLECTION: &str = "license_keys";
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

const SHARED_CONFIG_DIR: &str = "MahilMartPOS";
const SHARED_CONFIG_FILE: &str = "license_mongo_config.ini";

/// Resolved service settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub policy: DerivationPolicy,
    /// Source tag stamped on issued records.
    pub source: String,
    /// Base layer of the remote target.
    pub default_target: RemoteTarget,
    /// Upper bound on any single remote call.
    pub remote_timeout: Duration,
    /// Shared INI file read by POS installs; `None` when no location exists.
    pub shared_config_path: Option<PathBuf>,
    /// Local SQLite database file.
    pub database_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            policy: DerivationPolicy::new(DEFAULT_LICENSE_EMAIL),
            source: DEFAULT_SOURCE.to_string(),
            default_target: RemoteTarget::new("", DEFAULT_MONGO_DB, DEFAULT_MONGO_COLLECTION),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            shared_config_path: None,
            database_path: PathBuf::from("licenses.db"),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_process_env() -> Self {
        Self::from_env(&Env::real())
    }

    /// Build settings from `env`. Malformed values fall back to defaults.
    pub fn from_env(env: &Env) -> Self {
        let email = lookup(env, ENV_EMAIL)
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| DEFAULT_LICENSE_EMAIL.to_string());

        let seed_mode = lookup(env, ENV_SEED_MODE)
            .map(|raw| SeedMode::from_config_str(&raw))
            .unwrap_or_default();

        let validity = lookup(env, ENV_VALIDITY_MINUTES)
            .map(|raw| ValidityWindow::from_config_str(&raw))
            .unwrap_or_default();

        let default_target = RemoteTarget::new(
            lookup(env, ENV_MONGO_URI).unwrap_or_default(),
            lookup(env, ENV_MONGO_DB).unwrap_or_else(|| DEFAULT_MONGO_DB.to_string()),
            lookup(env, ENV_MONGO_COLLECTION)
                .unwrap_or_else(|| DEFAULT_MONGO_COLLECTION.to_string()),
        );

        Self {
            policy: DerivationPolicy::new(email)
                .seed_mode(seed_mode)
                .validity(validity),
            source: lookup(env, ENV_SOURCE).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            default_target,
            remote_timeout: remote_timeout(env),
            shared_config_path: shared_config_path(env),
            database_path: database_path(env),
        }
    }
}

fn remote_timeout(env: &Env) -> Duration {
    let Some(raw) = env.non_empty(ENV_REMOTE_TIMEOUT_SECS) else {
        return DEFAULT_REMOTE_TIMEOUT;
    };
    match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs.max(1)),
        Err(_) => {
            tracing::warn!(value = %raw, "invalid remote timeout, using default");
            DEFAULT_REMOTE_TIMEOUT
        }
    }
}

/// Where the shared INI file lives.
///
/// An explicit override wins, then `%PROGRAMDATA%`, then the platform
/// config directory.
pub fn shared_config_path(env: &Env) -> Option<PathBuf> {
    if let Some(path) = lookup(env, ENV_SHARED_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }
    env.non_empty("PROGRAMDATA")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .map(|base| base.join(SHARED_CONFIG_DIR).join(SHARED_CONFIG_FILE))
}

fn database_path(env: &Env) -> PathBuf {
    if let Some(path) = lookup(env, ENV_DB_PATH) {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("license-manager").join("licenses.db"))
        .unwrap_or_else(|| PathBuf::from("licenses.db"))
}
