//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries all
//! sub-configs for the HTTP server, token auth, object storage, and the song
//! catalog. Every section defaults sensibly so an empty file only lacks the
//! signing secret.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Locations searched when no explicit config path is given.
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./streamgate.toml",
    "~/.config/streamgate/config.toml",
    "/etc/streamgate/config.toml",
];

// ---------------------------------------------------------------------------
// Secret
// ---------------------------------------------------------------------------

/// A credential string whose `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True when the value is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub streaming: StreamingConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `path`, or from the first default location
    /// that exists, falling back to [`Config::default`].
    ///
    /// An explicit path that cannot be read is an error; missing default
    /// locations are not.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(candidate);
            let candidate = Path::new(expanded.as_ref());
            if candidate.exists() {
                tracing::info!("Loading config from {}", candidate.display());
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Apply `STREAMGATE_*` (and `PORT`) environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup, so tests need not touch the
    /// process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("STREAMGATE_SECRET") {
            self.auth.signing_secret = Some(Secret::new(v.trim()));
        }
        if let Some(v) = get("STREAMGATE_API_KEY") {
            self.auth.api_key = Some(Secret::new(v.trim()));
        }
        if let Some(v) = get("STREAMGATE_STORAGE_URL") {
            self.storage.url = v.trim().to_string();
        }
        if let Some(v) = get("STREAMGATE_STORAGE_KEY") {
            self.storage.service_key = Some(Secret::new(v.trim()));
        }
        if let Some(v) = get("STREAMGATE_BUCKET") {
            self.storage.bucket = v.trim().to_string();
        }
        if let Some(v) = get("STREAMGATE_DB_PATH") {
            self.catalog.db_path = PathBuf::from(v.trim());
        }
        if let Some(v) = get("PORT") {
            match v.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT override: {v}"),
            }
        }
    }

    /// Check the settings the server cannot run without.
    pub fn validate(&self) -> Result<()> {
        match &self.auth.signing_secret {
            Some(secret) if !secret.is_blank() => {}
            _ => {
                return Err(Error::Config(
                    "auth.signing_secret is required (or set STREAMGATE_SECRET)".into(),
                ))
            }
        }

        if self.storage.url.trim().is_empty() {
            return Err(Error::Config(
                "storage.url is required (or set STREAMGATE_STORAGE_URL)".into(),
            ));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(Error::Config("storage.bucket must not be empty".into()));
        }

        if self.streaming.master_filename.trim().is_empty()
            || self.streaming.master_filename.contains('/')
        {
            return Err(Error::Config(
                "streaming.master_filename must be a bare file name".into(),
            ));
        }

        Ok(())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.storage.service_key.as_ref().map_or(true, Secret::is_blank) {
            warnings.push("storage.service_key is not set; storage requests are anonymous".into());
        }

        if self.auth.default_ttl_minutes <= 0 {
            warnings.push("auth.default_ttl_minutes is not positive; tokens expire at once".into());
        }

        if self.auth.max_ttl_minutes < self.auth.default_ttl_minutes {
            warnings.push(format!(
                "auth.max_ttl_minutes ({}) is below default_ttl_minutes ({}); default is clamped",
                self.auth.max_ttl_minutes, self.auth.default_ttl_minutes
            ));
        }

        if self.storage.signed_url_ttl_secs == 0 {
            warnings.push("storage.signed_url_ttl_secs is 0; redirects expire immediately".into());
        }

        if self.auth.api_key.is_none() {
            warnings.push("auth.api_key is not set; /token is open to anyone".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Default `Cache-Control` for responses that do not set their own.
    pub cache_control: String,
    /// Allowed CORS origins; empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            cache_control: "private, max-age=600".into(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

/// Token signing and issuance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for stream tokens.
    pub signing_secret: Option<Secret>,
    /// When set, `/token` requires a matching `X-API-Key` header.
    pub api_key: Option<Secret>,
    /// Token lifetime when the caller does not ask for one.
    pub default_ttl_minutes: i64,
    /// Upper bound for caller-requested lifetimes.
    pub max_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            api_key: None,
            default_ttl_minutes: 10,
            max_ttl_minutes: 1440,
        }
    }
}

/// Object-storage backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the storage service, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub service_key: Option<Secret>,
    pub bucket: String,
    /// Lifetime of the signed URLs segment requests are redirected to.
    pub signed_url_ttl_secs: u64,
    pub request_timeout_secs: u64,
    /// Largest manifest the gateway will download and rewrite.
    pub max_manifest_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            service_key: None,
            bucket: "songs".into(),
            signed_url_ttl_secs: 60,
            request_timeout_secs: 30,
            max_manifest_bytes: 1024 * 1024,
        }
    }
}

/// Song catalog (SQLite) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub db_path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./streamgate.db"),
        }
    }
}

/// Stream layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// File name of the master manifest inside each stream folder.
    pub master_filename: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            master_filename: "master.m3u8".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.signing_secret = Some(Secret::new("s3cret"));
        config.storage.url = "https://storage.example.com".into();
        config
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cache_control, "private, max-age=600");
        assert_eq!(config.auth.default_ttl_minutes, 10);
        assert_eq!(config.storage.signed_url_ttl_secs, 60);
        assert_eq!(config.streaming.master_filename, "master.m3u8");
        assert!(config.auth.signing_secret.is_none());
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 9000

            [auth]
            signing_secret = "abc"

            [storage]
            bucket = "audio"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.auth.signing_secret.unwrap().expose(), "abc");
        assert_eq!(config.storage.bucket, "audio");
        assert_eq!(config.storage.request_timeout_secs, 30);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");

        let mut config = Config::default();
        config.auth.signing_secret = Some(secret);
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn validate_requires_secret() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.auth.signing_secret = None;
        assert!(config.validate().is_err());

        config.auth.signing_secret = Some(Secret::new("   "));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_requires_storage_url_and_bucket() {
        let mut config = valid_config();
        config.storage.url.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.storage.bucket = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_nested_master_filename() {
        let mut config = valid_config();
        config.streaming.master_filename = "nested/master.m3u8".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_apply_and_trim() {
        let env: HashMap<&str, &str> = [
            ("STREAMGATE_SECRET", "  from-env \n"),
            ("STREAMGATE_BUCKET", "tracks"),
            ("STREAMGATE_STORAGE_URL", "http://localhost:9999"),
            ("PORT", "3000"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.auth.signing_secret.unwrap().expose(), "from-env");
        assert_eq!(config.storage.bucket, "tracks");
        assert_eq!(config.storage.url, "http://localhost:9999");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn blank_and_invalid_overrides_are_ignored() {
        let mut config = valid_config();
        config.apply_overrides(|k| match k {
            "STREAMGATE_SECRET" => Some("   ".into()),
            "PORT" => Some("not-a-port".into()),
            _ => None,
        });
        assert_eq!(config.auth.signing_secret.unwrap().expose(), "s3cret");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn warnings_for_open_token_endpoint() {
        let config = valid_config();
        let warnings = config.warnings();
        assert!(warnings.iter().any(|w| w.contains("auth.api_key")));
        assert!(warnings.iter().any(|w| w.contains("storage.service_key")));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streamgate.toml");
        std::fs::write(&path, "[catalog]\ndb_path = \"/tmp/songs.db\"\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.catalog.db_path, PathBuf::from("/tmp/songs.db"));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(Config::load_or_default(Some(&path)).is_err());
    }
}
