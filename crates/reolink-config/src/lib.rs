//! Shared configuration for Reolink tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `reolink_core::ClientConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use reolink_core::{ClientConfig, Credentials, TlsVerification};

const KEYRING_SERVICE: &str = "reolink";

/// Environment variable consulted before the keyring.
pub const PASSWORD_ENV: &str = "REOLINK_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String, available: Vec<String> },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named camera profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, listing the known profiles on failure.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.profiles.keys().cloned().collect();
            available.sort();
            ConfigError::ProfileNotFound {
                name: name.into(),
                available,
            }
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// One camera or NVR.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Hostname or IP address.
    pub host: String,

    /// HTTP(S) port; omitted means the scheme default.
    pub port: Option<u16>,

    /// Force (`true`) or forbid (`false`) HTTPS.
    pub https: Option<bool>,

    /// Login user, `admin` when omitted.
    pub username: Option<String>,

    /// Password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// Digest handshake and payload encryption over plain HTTP.
    pub encrypted_login: Option<bool>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// `false` verifies certificates against the system store.
    pub insecure: Option<bool>,

    pub timeout: Option<u64>,
}

impl Profile {
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or("admin")
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "reolink", "reolink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("reolink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `REOLINK_` environment variables.
///
/// Nested keys use a double underscore, e.g.
/// `REOLINK_PROFILES__FRONT__HOST`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("REOLINK_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password)?;
    Ok(())
}

/// Resolve a profile's password: `REOLINK_PASSWORD`, the profile's
/// `password_env`, the keyring, then plaintext.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Global env var
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    // 2. Profile's password_env
    if let Some(env_name) = &profile.password_env
        && let Ok(pw) = std::env::var(env_name)
    {
        return Ok(SecretString::from(pw));
    }

    // 3. System keyring
    if let Ok(pw) = keyring_entry(profile_name).and_then(|entry| entry.get_password()) {
        return Ok(SecretString::from(pw));
    }

    // 4. Plaintext in config
    if let Some(pw) = &profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// TLS strategy for a profile. Cameras ship self-signed certificates, so
/// verification is off unless a CA is given or `insecure = false`.
pub fn tls_for(profile: &Profile) -> TlsVerification {
    match (&profile.ca_cert, profile.insecure) {
        (_, Some(true)) => TlsVerification::DangerAcceptInvalid,
        (Some(ca), _) => TlsVerification::CustomCa(ca.clone()),
        (None, Some(false)) => TlsVerification::SystemDefaults,
        (None, None) => TlsVerification::DangerAcceptInvalid,
    }
}

/// Build a `ClientConfig` from a profile, with no CLI overrides.
pub fn profile_to_client_config(profile: &Profile, profile_name: &str) -> Result<ClientConfig, ConfigError> {
    validate(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;
    Ok(client_config_with_password(profile, password))
}

/// Build a `ClientConfig` from a profile and an already known password.
pub fn client_config_with_password(profile: &Profile, password: SecretString) -> ClientConfig {
    ClientConfig {
        host: profile.host.clone(),
        port: profile.port,
        use_https: profile.https,
        credentials: Some(Credentials {
            username: profile.username().to_owned(),
            password,
        }),
        encrypted_login: profile.encrypted_login.unwrap_or(true),
        tls: tls_for(profile),
        timeout: Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout)),
    }
}

/// Reject profiles that cannot name a camera.
pub fn validate(profile: &Profile, profile_name: &str) -> Result<(), ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("profile '{profile_name}' has no host"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "front"

[defaults]
output = "json"

[profiles.front]
host = "192.168.1.50"
password = "hunter2"
password_env = "REOLINK_TEST_UNSET_FRONT"

[profiles.nvr]
host = "nvr.local"
port = 443
username = "viewer"
encrypted_login = false
insecure = false
timeout = 5
"#;

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).expect("write sample");
        (dir, path)
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let (_dir, path) = write_sample();
        let cfg = load_config_from(&path).expect("loads");
        assert_eq!(cfg.default_profile.as_deref(), Some("front"));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 30);

        let nvr = cfg.profile("nvr").expect("nvr profile");
        assert_eq!(nvr.port, Some(443));
        assert_eq!(nvr.username(), "viewer");
        assert_eq!(cfg.profile("front").expect("front").username(), "admin");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config_from(&dir.path().join("absent.toml")).expect("loads");
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn unknown_profile_lists_available() {
        let (_dir, path) = write_sample();
        let cfg = load_config_from(&path).expect("loads");
        match cfg.profile("garage") {
            Err(ConfigError::ProfileNotFound { available, .. }) => {
                assert_eq!(available, vec!["front".to_owned(), "nvr".to_owned()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "door".into(),
            Profile {
                host: "10.0.0.9".into(),
                https: Some(true),
                ..Profile::default()
            },
        );
        save_config_to(&cfg, &path).expect("saves");

        let loaded = load_config_from(&path).expect("loads");
        let door = loaded.profile("door").expect("door");
        assert_eq!(door.host, "10.0.0.9");
        assert_eq!(door.https, Some(true));
    }

    #[test]
    fn plaintext_password_is_the_last_resort() {
        let profile = Profile {
            host: "cam".into(),
            password: Some("hunter2".into()),
            password_env: Some("REOLINK_TEST_UNSET_PLAINTEXT".into()),
            ..Profile::default()
        };
        if std::env::var(PASSWORD_ENV).is_err() {
            let secret = resolve_password(&profile, "reolink-test-no-such-profile").expect("resolves");
            assert_eq!(secret.expose_secret(), "hunter2");
        }
    }

    #[test]
    fn tls_strategy() {
        let mut profile = Profile::default();
        assert_eq!(tls_for(&profile), TlsVerification::DangerAcceptInvalid);
        profile.insecure = Some(false);
        assert_eq!(tls_for(&profile), TlsVerification::SystemDefaults);
        profile.ca_cert = Some(PathBuf::from("/etc/ca.pem"));
        assert_eq!(
            tls_for(&profile),
            TlsVerification::CustomCa(PathBuf::from("/etc/ca.pem"))
        );
        profile.insecure = Some(true);
        assert_eq!(tls_for(&profile), TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn profile_translates_to_client_config() {
        let profile = Profile {
            host: "10.0.0.9".into(),
            port: Some(8000),
            username: Some("viewer".into()),
            password: Some("pw".into()),
            encrypted_login: Some(false),
            timeout: Some(7),
            ..Profile::default()
        };
        let config = profile_to_client_config(&profile, "reolink-test-no-such-profile").expect("builds");
        assert_eq!(config.host, "10.0.0.9");
        assert_eq!(config.port, Some(8000));
        assert!(!config.encrypted_login);
        assert_eq!(config.timeout, Duration::from_secs(7));
        assert_eq!(config.credentials.expect("credentials").username, "viewer");
    }

    #[test]
    fn empty_host_is_rejected() {
        let err = profile_to_client_config(&Profile::default(), "x").expect_err("no host");
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
