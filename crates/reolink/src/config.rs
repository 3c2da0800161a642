//! CLI flag overrides on top of `reolink-config` profiles.
//!
//! This is the single boundary where CLI options cross into
//! `reolink_core::ClientConfig`.

use secrecy::SecretString;

use reolink_config::{Config, Profile};
use reolink_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `ClientConfig` for this invocation.
///
/// An explicit `--profile` must exist. Otherwise the default profile is
/// used if present, and `--host` alone describes an ad-hoc camera.
pub fn build_client_config(global: &GlobalOpts, config: &Config) -> Result<ClientConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let profile = match (config.profile(&profile_name), &global.profile, &global.host) {
        (Ok(profile), _, _) => profile.clone(),
        (Err(e), Some(_), _) => return Err(e.into()),
        (Err(_), None, Some(host)) => Profile {
            host: host.clone(),
            ..Profile::default()
        },
        (Err(_), None, None) => {
            return Err(CliError::NoConfig {
                path: reolink_config::config_path().display().to_string(),
            });
        }
    };

    let profile = apply_overrides(profile, global, config.defaults.timeout);
    reolink_config::validate(&profile, &profile_name)?;

    let password = if global.ask_password {
        prompt_password(profile.username())?
    } else {
        reolink_config::resolve_password(&profile, &profile_name)?
    };
    Ok(reolink_config::client_config_with_password(&profile, password))
}

/// Flags override profile fields.
fn apply_overrides(mut profile: Profile, global: &GlobalOpts, default_timeout: u64) -> Profile {
    if let Some(host) = &global.host {
        profile.host.clone_from(host);
    }
    if global.port.is_some() {
        profile.port = global.port;
    }
    if let Some(username) = &global.username {
        profile.username = Some(username.clone());
    }
    if global.https {
        profile.https = Some(true);
    } else if global.http {
        profile.https = Some(false);
    }
    if global.no_encrypt {
        profile.encrypted_login = Some(false);
    }
    if global.verify_tls {
        profile.insecure = Some(false);
    }
    profile.timeout = global.timeout.or(profile.timeout).or(Some(default_timeout));
    profile
}

fn prompt_password(username: &str) -> Result<SecretString, CliError> {
    let password = rpassword::prompt_password(format!("Password for {username}: "))?;
    Ok(SecretString::from(password))
}

/// Human description of a TLS strategy, for `config show`.
pub fn describe_tls(tls: &TlsVerification) -> String {
    match tls {
        TlsVerification::SystemDefaults => "verify (system store)".into(),
        TlsVerification::CustomCa(path) => format!("verify ({})", path.display()),
        TlsVerification::DangerAcceptInvalid => "accept self-signed".into(),
    }
}
