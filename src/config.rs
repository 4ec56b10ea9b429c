use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Public artifact root; `final/` and `segments/` live beneath it.
    pub podcast_dir: String,
    /// Staging root for uploaded documents, never exposed externally.
    pub temp_dir: String,
    /// Command line invoked to run the external conversion collaborator.
    pub converter_cmd: String,
    /// Upper bound on conversions running at once.
    pub max_concurrent_jobs: usize,
    /// Overall deadline for a single conversion, in seconds.
    pub conversion_timeout_secs: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Research paper to podcast API")]
pub struct Args {
    /// Host to bind to (overrides PODCAST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PODCAST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Artifact root directory (overrides PODCAST_DIR)
    #[arg(long)]
    pub podcast_dir: Option<String>,

    /// Staging directory for uploads (overrides PODCAST_TEMP_DIR)
    #[arg(long)]
    pub temp_dir: Option<String>,

    /// Converter command line (overrides PODCAST_CONVERTER_CMD)
    #[arg(long)]
    pub converter_cmd: Option<String>,

    /// Maximum concurrent conversions (overrides PODCAST_MAX_CONCURRENT_JOBS)
    #[arg(long)]
    pub max_concurrent_jobs: Option<usize>,

    /// Conversion timeout in seconds (overrides PODCAST_CONVERSION_TIMEOUT_SECS)
    #[arg(long)]
    pub conversion_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("PODCAST_HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let env_port = parse_env("PODCAST_PORT", 8000u16)?;
        let env_podcast = env::var("PODCAST_DIR").unwrap_or_else(|_| "podcast".into());
        let env_temp = env::var("PODCAST_TEMP_DIR").unwrap_or_else(|_| "temp".into());
        let env_converter =
            env::var("PODCAST_CONVERTER_CMD").unwrap_or_else(|_| "generate-podcast".into());
        let env_max_jobs = parse_env("PODCAST_MAX_CONCURRENT_JOBS", 4usize)?;
        let env_timeout = parse_env("PODCAST_CONVERSION_TIMEOUT_SECS", 900u64)?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            podcast_dir: args.podcast_dir.unwrap_or(env_podcast),
            temp_dir: args.temp_dir.unwrap_or(env_temp),
            converter_cmd: args.converter_cmd.unwrap_or(env_converter),
            max_concurrent_jobs: args.max_concurrent_jobs.unwrap_or(env_max_jobs),
            conversion_timeout_secs: args.conversion_timeout_secs.unwrap_or(env_timeout),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
