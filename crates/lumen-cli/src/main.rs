mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_FATAL};
use lumen_core::install_signal_handler;
use lumen_schema::{parse_config_file, LumenConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "lumen",
    version,
    about = "Video player host with GPU shader quality profiles"
)]
struct Cli {
    /// Path to the configuration file (default: ~/.config/lumen/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Play a media file with a quality profile.
    Play {
        /// File path or URL handed to the engine.
        file: String,
        /// Quality profile name (light, normal, high).
        #[arg(long)]
        profile: Option<String>,
        /// Engine backend (libmpv, mock); overrides the config file.
        #[arg(long)]
        backend: Option<String>,
        /// Extra engine command line to run after loading, e.g. "set pause yes".
        #[arg(long = "exec")]
        exec: Vec<String>,
    },
    /// List the built-in quality profiles.
    Profiles,
    /// Show the engine options applied at creation, or by a profile.
    Options {
        /// Show the batch this profile applies instead of the baseline.
        #[arg(long)]
        profile: Option<String>,
    },
    /// Run diagnostic checks on the configuration and engine backends.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn load_config(path: Option<&Path>) -> Result<LumenConfig, String> {
    match path {
        Some(path) => parse_config_file(path),
        None => LumenConfig::load_default(),
    }
    .map_err(|e| format!("config error: {e}"))
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LUMEN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Play {
            file,
            profile,
            backend,
            exec,
        } => load_config(config_path).and_then(|config| {
            install_signal_handler();
            commands::play::run(
                &config,
                &file,
                profile.as_deref(),
                backend.as_deref(),
                &exec,
                json_output,
            )
        }),
        Commands::Profiles => load_config(config_path)
            .and_then(|config| commands::profiles::run(&config, json_output)),
        Commands::Options { profile } => load_config(config_path).and_then(|config| {
            commands::options::run(&config, profile.as_deref(), json_output)
        }),
        Commands::Doctor => commands::doctor::run(config_path, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("fatal:") {
                EXIT_FATAL
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
