//! Profile catalog, engine option batches, and configuration for Lumen.
//!
//! This crate defines the data layer: the immutable catalog of quality profiles
//! (`QualityProfile`), the ordered option batches applied to the engine
//! (`OptionBatch`, `baseline_batch`), and the TOML configuration file
//! (`LumenConfig`) the CLI and host are driven by.

pub mod config;
pub mod options;
pub mod profile;

pub use config::{
    default_config_path, parse_config_file, parse_config_str, ConfigError, EngineSettings,
    EventPumpSection, FatalPolicy, FatalSection, LumenConfig, ProfileSection, ShaderSection,
};
pub use options::{baseline_batch, EngineOption, OptionBatch, SHADERS_APPEND, SHADERS_CLEAR};
pub use profile::{
    find_profile, get_profile, list_profiles, ProfileError, QualityProfile,
    BUILTIN_PROFILES, DEFAULT_PROFILE, MAX_PROFILE_SHADERS,
};
