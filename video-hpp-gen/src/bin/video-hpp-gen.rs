//! CLI entry point for video-hpp-gen.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use video_hpp_gen::config::{self, Config};

/// Environment variable naming a `video-hpp-gen.toml` to load instead of the
/// built-in configuration.
const CONFIG_ENV: &str = "VIDEO_HPP_GEN_CONFIG";

/// video-hpp-gen — generate the C++ video header from the video XML registry.
#[derive(Parser, Debug)]
#[command(name = "video-hpp-gen", version, about)]
struct Cli {
    /// Registry XML to read (overrides the configured input).
    #[arg(short = 'f', value_name = "FILENAME")]
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("video_hpp_gen=info")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(255)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("video-hpp-gen: error: {e:#}");
            ExitCode::from(255)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            config::load_config(&path)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => Config::default(),
    };
    video_hpp_gen::run(&cfg, cli.file.as_deref())?;
    Ok(())
}
