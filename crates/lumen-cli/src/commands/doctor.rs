use super::{EXIT_FAILURE, EXIT_SUCCESS};
use lumen_runtime::select_backend;
use lumen_schema::{default_config_path, parse_config_file, LumenConfig, BUILTIN_PROFILES};
use std::path::Path;

pub fn run(config_path: Option<&Path>, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = check_config(config_path, &mut checks, &mut all_pass);
    check_backends(&config, &mut checks, &mut all_pass);
    check_shaders(&config, &mut checks);
    checks.push(Check::info(
        "profiles",
        &format!("{} built-in quality profiles", BUILTIN_PROFILES.len()),
    ));

    print_results(&checks, all_pass, json_output)
}

fn check_config(
    explicit: Option<&Path>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> LumenConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Ok(path) => path,
            Err(e) => {
                checks.push(Check::warn("config", &format!("No config location: {e}")));
                return LumenConfig::default();
            }
        },
    };

    if explicit.is_none() && !path.exists() {
        checks.push(Check::info(
            "config",
            &format!("No config at {} (using defaults)", path.display()),
        ));
        return LumenConfig::default();
    }

    match parse_config_file(&path) {
        Ok(config) => {
            checks.push(Check::pass(
                "config",
                &format!("Config {} is valid", path.display()),
            ));
            config
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail(
                "config",
                &format!("Config {} is invalid: {e}", path.display()),
            ));
            LumenConfig::default()
        }
    }
}

fn check_backends(config: &LumenConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let configured = config.engine.backend.as_str();
    match select_backend(configured) {
        Ok(backend) if backend.available() => checks.push(Check::pass(
            "backend",
            &format!("Engine backend '{configured}' is available"),
        )),
        Ok(_) => {
            *all_pass = false;
            checks.push(Check::fail(
                "backend",
                &format!("Engine backend '{configured}' is not available (is libmpv installed?)"),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("backend", &e.to_string()));
        }
    }

    if configured != "libmpv" {
        let libmpv = select_backend("libmpv").is_ok_and(|b| b.available());
        let msg = if libmpv {
            "libmpv is available"
        } else {
            "libmpv is not available"
        };
        checks.push(Check::info("libmpv", msg));
    }
}

fn check_shaders(config: &LumenConfig, checks: &mut Vec<Check>) {
    let Some(dir) = config.shader_dir() else {
        checks.push(Check::info(
            "shaders",
            "No shader directory configured (engine resolves shader names)",
        ));
        return;
    };
    if !dir.is_dir() {
        checks.push(Check::warn(
            "shaders",
            &format!("Shader directory {} does not exist", dir.display()),
        ));
        return;
    }

    let mut missing: Vec<&str> = BUILTIN_PROFILES
        .iter()
        .flat_map(|p| p.shaders.iter().copied())
        .filter(|s| !dir.join(s).is_file())
        .collect();
    missing.sort_unstable();
    missing.dedup();
    if missing.is_empty() {
        checks.push(Check::pass(
            "shaders",
            &format!("All profile shaders present in {}", dir.display()),
        ));
    } else {
        checks.push(Check::warn(
            "shaders",
            &format!("Missing shaders: {}", missing.join(", ")),
        ));
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("Lumen Doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}
