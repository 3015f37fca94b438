//! Buffer mirror entrypoint.

use anyhow::Context;
use bufmirror::channel::resolve_channel_path;
use bufmirror::{Config, CoordinatePolicy, FileChannel, IndexMode, MirrorEngine, TerminalSink};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mirror a remote editor buffer from its modification channel.
#[derive(Parser, Debug)]
#[command(name = "bufmirror", about = "Mirror a remote editor buffer", version)]
struct Cli {
    /// Editor client whose edits are mirrored
    #[arg(requires = "file")]
    client: Option<String>,

    /// File open in that client
    file: Option<PathBuf>,

    /// Read this channel file instead of resolving one from CLIENT and FILE
    #[arg(long, conflicts_with_all = ["client", "file"])]
    channel: Option<PathBuf>,

    /// Directory holding channel files
    #[arg(long)]
    channel_dir: Option<PathBuf>,

    /// Out-of-range edit handling: strict or clamp
    #[arg(long)]
    coordinates: Option<CoordinatePolicy>,

    /// Line index maintenance: incremental or rebuild
    #[arg(long)]
    index: Option<IndexMode>,

    /// Largest accepted record payload in bytes
    #[arg(long)]
    max_payload: Option<usize>,

    /// Do not clear the screen between frames
    #[arg(long)]
    no_clear: bool,

    /// Print a JSON run summary to stderr on exit
    #[arg(long)]
    stats: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bufmirror=info,bufmirror_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn apply_overrides(cli: &Cli, mut config: Config) -> Config {
    if let Some(dir) = &cli.channel_dir {
        config.channel_dir = dir.clone();
    }
    if let Some(policy) = cli.coordinates {
        config.coordinates = policy;
    }
    if let Some(mode) = cli.index {
        config.index_mode = mode;
    }
    if let Some(max_payload) = cli.max_payload {
        config.max_payload_len = max_payload;
    }
    if cli.no_clear {
        config.clear_screen = false;
    }
    config
}

fn channel_path(cli: &Cli, config: &Config) -> anyhow::Result<PathBuf> {
    if let Some(channel) = &cli.channel {
        return Ok(channel.clone());
    }
    match (&cli.client, &cli.file) {
        (Some(client), Some(file)) => resolve_channel_path(&config.channel_dir, client, file)
            .with_context(|| format!("Failed to resolve channel for {}", file.display())),
        _ => anyhow::bail!(
            "Either CLIENT and FILE or --channel is required. Use --help for usage."
        ),
    }
}

fn run() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = apply_overrides(&cli, Config::from_env());
    let path = channel_path(&cli, &config)?;

    let channel = FileChannel::open(&path)
        .with_context(|| format!("Failed to open channel {}", path.display()))?;
    tracing::info!("Mirroring channel {}", path.display());

    let mut engine = MirrorEngine::new(channel, TerminalSink::stdout(config.clear_screen), &config);
    let result = engine.run();
    if cli.stats {
        eprintln!("{}", serde_json::to_string_pretty(engine.stats())?);
    }
    result?;
    Ok(())
}

fn main() {
    let exit_code = run_and_report(run);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run_and_report<F, E>(runner: F) -> i32
where
    F: FnOnce() -> Result<(), E>,
    E: std::fmt::Display,
{
    match runner() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("bufmirror error: {}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn run_and_report_returns_zero_on_success() {
        let exit_code = run_and_report(|| Ok::<(), &str>(()));
        assert_eq!(exit_code, 0);
    }

    #[test]
    fn run_and_report_returns_non_zero_on_failure() {
        let exit_code = run_and_report(|| Err::<(), &str>("boom"));
        assert_eq!(exit_code, 1);
    }

    #[test]
    fn client_and_file_resolve_inside_channel_dir() {
        let cli = parse(&[
            "bufmirror",
            "client0",
            "/tmp/notes.txt",
            "--channel-dir",
            "/run/channels",
        ]);
        let config = apply_overrides(&cli, Config::default());
        let path = channel_path(&cli, &config).expect("path");
        assert_eq!(
            path,
            Path::new("/run/channels/kakoune_client0_5B3A0814598C3C8B17FBD5688134D673")
        );
    }

    #[test]
    fn explicit_channel_wins() {
        let cli = parse(&["bufmirror", "--channel", "/tmp/feed"]);
        let path = channel_path(&cli, &Config::default()).expect("path");
        assert_eq!(path, Path::new("/tmp/feed"));
    }

    #[test]
    fn missing_channel_arguments_are_rejected() {
        let cli = parse(&["bufmirror"]);
        let err = channel_path(&cli, &Config::default()).expect_err("no channel");
        assert!(err.to_string().contains("--channel"));
        assert!(Cli::try_parse_from(["bufmirror", "only-client"]).is_err());
        assert!(Cli::try_parse_from(["bufmirror", "c", "f", "--channel", "x"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "bufmirror",
            "--channel",
            "/tmp/feed",
            "--coordinates",
            "clamp",
            "--index",
            "rebuild",
            "--max-payload",
            "4096",
            "--no-clear",
        ]);
        let config = apply_overrides(&cli, Config::default());
        assert_eq!(config.coordinates, CoordinatePolicy::Clamp);
        assert_eq!(config.index_mode, IndexMode::Rebuild);
        assert_eq!(config.max_payload_len, 4096);
        assert!(!config.clear_screen);
    }

    #[test]
    fn invalid_policy_is_a_parse_error() {
        assert!(Cli::try_parse_from(["bufmirror", "--coordinates", "loose"]).is_err());
    }
}
