use super::{json_pretty, resolve_profile, EXIT_SUCCESS};
use lumen_schema::{baseline_batch, LumenConfig};

pub fn run(config: &LumenConfig, profile: Option<&str>, json: bool) -> Result<u8, String> {
    let batch = match profile {
        Some(name) => resolve_profile(config, Some(name))?.option_batch(config.shader_dir()),
        None => baseline_batch(&config.engine, config.shader_dir()),
    };

    if json {
        println!("{}", json_pretty(&batch)?);
    } else {
        for option in &batch {
            println!("{}={}", option.name, option.value);
        }
    }
    Ok(EXIT_SUCCESS)
}
