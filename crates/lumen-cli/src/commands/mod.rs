pub mod completions;
pub mod doctor;
pub mod options;
pub mod play;
pub mod profiles;

use lumen_core::CoreError;
use lumen_schema::{find_profile, LumenConfig, QualityProfile, BUILTIN_PROFILES, DEFAULT_PROFILE};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_FATAL: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Render a host error, tagging fatal ones so `main` exits with `EXIT_FATAL`.
pub fn describe(err: &CoreError) -> String {
    if err.is_fatal() {
        format!("fatal: {err}")
    } else {
        err.to_string()
    }
}

/// Profile from the command line, else the config default, else the catalog
/// default.
pub fn resolve_profile(
    config: &LumenConfig,
    requested: Option<&str>,
) -> Result<&'static QualityProfile, String> {
    match requested.or(config.profile.default.as_deref()) {
        Some(name) => find_profile(name).ok_or_else(|| {
            let known: Vec<&str> = BUILTIN_PROFILES.iter().map(|p| p.name).collect();
            format!("unknown profile '{name}' (known: {})", known.join(", "))
        }),
        None => Ok(&BUILTIN_PROFILES[DEFAULT_PROFILE]),
    }
}

pub fn colorize_profile(name: &str) -> String {
    use console::Style;
    match name {
        "light" => Style::new().green().apply_to(name).to_string(),
        "normal" => Style::new().cyan().apply_to(name).to_string(),
        "high" => Style::new().magenta().bold().apply_to(name).to_string(),
        other => other.to_owned(),
    }
}
