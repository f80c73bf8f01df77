//! testship - run test projects on a remote execution service
//!
//! CLI binary that packages a local test project, submits it as a remote
//! build and optionally waits for the result.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use testship::config::{DEFAULT_CONFIG_FILE, RunArgs};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;

/// Environment variable holding the log filter
const LOG_ENV: &str = "TESTSHIP_LOG";

#[derive(Parser)]
#[command(name = "testship")]
#[command(about = "Run test projects on the testship execution service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the project as a remote build
    Run(RunCommand),

    /// Write a starter testship.json
    Init {
        /// Directory to write into
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct RunCommand {
    /// Path to the configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Account username
    #[arg(short, long)]
    username: Option<String>,

    /// Account access key
    #[arg(short = 'k', long = "key")]
    access_key: Option<String>,

    /// Build name shown on the dashboard
    #[arg(short, long)]
    build_name: Option<String>,

    /// Number of machines to run on (-1 for the account maximum)
    #[arg(short, long, allow_hyphen_values = true)]
    parallels: Option<i64>,

    /// Framework config, relative to the project dir
    #[arg(long)]
    framework_config: Option<PathBuf>,

    /// Spec globs to run
    #[arg(short, long, value_delimiter = ',')]
    specs: Vec<String>,

    /// Test environment variables
    #[arg(short, long, value_delimiter = ',', value_parser = parse_env_pair)]
    env: Vec<(String, String)>,

    /// Globs to leave out of the archive
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Do not warn about an empty dependency list
    #[arg(long)]
    disable_dependency_warning: bool,

    /// Do not send usage reports
    #[arg(long)]
    disable_usage_reporting: bool,

    /// Wait for the build to finish and exit with its result
    #[arg(long)]
    sync: bool,
}

impl From<RunCommand> for RunArgs {
    fn from(cmd: RunCommand) -> Self {
        Self {
            config_file: cmd.config_file,
            username: cmd.username,
            access_key: cmd.access_key,
            build_name: cmd.build_name,
            parallels: cmd.parallels,
            framework_config: cmd.framework_config,
            specs: cmd.specs,
            env: cmd.env.into_iter().collect::<BTreeMap<_, _>>(),
            exclude: cmd.exclude,
            disable_dependency_warning: cmd.disable_dependency_warning,
            disable_usage_reporting: cmd.disable_usage_reporting,
            sync: cmd.sync,
        }
    }
}

fn parse_env_pair(pair: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{pair}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{pair}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(cmd) => {
            let exit_code = cli::run_submission(cmd.into()).await;
            std::process::exit(exit_code);
        }
        Commands::Init { path, force } => {
            cli::run_init(&path, force).await?;
        }
    }

    Ok(())
}
