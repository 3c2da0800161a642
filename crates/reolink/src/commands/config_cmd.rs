//! Config subcommand handlers.

use std::fmt::Write;

use serde::Serialize;
use tabled::Tabled;

use reolink_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct ProfileEntry {
    name: String,
    host: String,
    port: Option<u16>,
    username: String,
    default: bool,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "User")]
    username: String,
    #[tabled(rename = "Default")]
    default: String,
}

/// Format config for display, masking passwords.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(default) = &cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        if let Some(port) = p.port {
            let _ = writeln!(out, "port = {port}");
        }
        if let Some(https) = p.https {
            let _ = writeln!(out, "https = {https}");
        }
        let _ = writeln!(out, "username = \"{}\"", p.username());
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(env) = &p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(encrypted) = p.encrypted_login {
            let _ = writeln!(out, "encrypted_login = {encrypted}");
        }
        let _ = writeln!(out, "# tls: {}", config::describe_tls(&reolink_config::tls_for(p)));
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    out
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = reolink_config::load_config_or_default();
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&reolink_config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = reolink_config::load_config_or_default();
            let mut entries: Vec<ProfileEntry> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileEntry {
                    name: name.clone(),
                    host: p.host.clone(),
                    port: p.port,
                    username: p.username().to_owned(),
                    default: cfg.default_profile.as_deref() == Some(name.as_str()),
                })
                .collect();
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let out = output::render_list(
                &global.output,
                &entries,
                |e| ProfileRow {
                    name: e.name.clone(),
                    host: e.port.map_or_else(|| e.host.clone(), |port| format!("{}:{port}", e.host)),
                    username: e.username.clone(),
                    default: if e.default { "*" } else { "" }.into(),
                },
                |e| e.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = reolink_config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let password = rpassword::prompt_password(format!("Password for profile '{profile_name}': "))?;
            if password.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }
            reolink_config::store_password(&profile_name, &password)?;
            if !global.quiet {
                eprintln!("Password for '{profile_name}' stored in the system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use reolink_config::Profile;

    use super::*;

    #[test]
    fn redacted_output_masks_password() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "front".into(),
            Profile {
                host: "192.168.1.50".into(),
                password: Some("hunter2".into()),
                ..Profile::default()
            },
        );
        let out = format_config_redacted(&cfg);
        assert!(out.contains("[profiles.front]"));
        assert!(out.contains("password = \"****\""));
        assert!(!out.contains("hunter2"));
        assert!(out.contains("username = \"admin\""));
    }
}
