use super::{colorize_profile, json_pretty, resolve_profile, EXIT_SUCCESS};
use lumen_schema::{list_profiles, LumenConfig};

pub fn run(config: &LumenConfig, json: bool) -> Result<u8, String> {
    let profiles = list_profiles();
    if json {
        println!("{}", json_pretty(&profiles)?);
        return Ok(EXIT_SUCCESS);
    }

    let default = resolve_profile(config, None)?.name;
    println!(
        "{:<3} {:<8} {:<18} {:<8} {:<7} DESCRIPTION",
        "#", "NAME", "SCALE", "SHADERS", "HWDEC"
    );
    for (index, profile) in profiles.iter().enumerate() {
        let marker = if profile.name == default { "*" } else { " " };
        println!(
            "{index:<3} {:<8} {:<18} {:<8} {:<7} {}{marker}",
            colorize_profile(profile.name),
            profile.scale,
            profile.shaders.len(),
            profile.hwdec,
            profile.description,
        );
    }
    Ok(EXIT_SUCCESS)
}
