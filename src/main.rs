use clap::{Parser, Subcommand};
use restictool::config::{self, ConfigResolver};
use restictool::error::ToolError;
use restictool::managers::logging::{init_logging, LoggingConfig};
use restictool::managers::tool::ResticTool;
use restictool::settings::{self, Settings, SubCommand, DEFAULT_IMAGE};
use restictool::utils::DockerRuntime;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "restictool")]
#[command(about = "Back up docker volumes and local directories with a dockerized restic", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default ~/.config/restictool/restictool.yml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Restic cache directory (default ~/.cache/restic)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Restic image
    #[arg(long, global = true, default_value = DEFAULT_IMAGE)]
    image: String,

    /// Pull the image before running
    #[arg(long, global = true)]
    force_pull: bool,

    /// Pass -q to restic
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write DEBUG logs into this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Check,

    /// Run restic with arbitrary arguments
    Run {
        /// Arguments passed to restic
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        restic_arguments: Vec<String>,
    },

    /// Back up the configured volumes and local directories
    Backup {
        /// Prune the repository after forgetting expired snapshots
        #[arg(short, long)]
        prune: bool,

        /// Arguments passed to restic
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        restic_arguments: Vec<String>,
    },

    /// Restore a snapshot into a directory
    Restore {
        /// Target directory
        #[arg(short, long = "restore", value_name = "DIR")]
        restore: PathBuf,

        /// Snapshot to restore
        #[arg(long, default_value = "latest")]
        snapshot: String,

        /// Arguments passed to restic
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        restic_arguments: Vec<String>,
    },

    /// List the snapshots
    Snapshots {
        /// Arguments passed to restic
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        restic_arguments: Vec<String>,
    },

    /// Check whether the repository exists and is reachable
    Exists {
        /// Arguments passed to restic
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        restic_arguments: Vec<String>,
    },
}

impl Commands {
    fn into_parts(self) -> (SubCommand, Vec<String>) {
        match self {
            Commands::Check => (SubCommand::Check, Vec::new()),
            Commands::Run { restic_arguments } => (SubCommand::Run, restic_arguments),
            Commands::Backup {
                prune,
                restic_arguments,
            } => (SubCommand::Backup { prune }, restic_arguments),
            Commands::Restore {
                restore,
                snapshot,
                restic_arguments,
            } => (
                SubCommand::Restore {
                    directory: restore,
                    snapshot,
                },
                restic_arguments,
            ),
            Commands::Snapshots { restic_arguments } => (SubCommand::Snapshots, restic_arguments),
            Commands::Exists { restic_arguments } => (SubCommand::Exists, restic_arguments),
        }
    }
}

fn settings_from(cli: Cli) -> Settings {
    let (subcommand, restic_arguments) = cli.command.into_parts();

    let mut settings = Settings::new(subcommand);
    settings.image = cli.image;
    settings.force_pull = cli.force_pull;
    settings.quiet = cli.quiet;
    settings.restic_arguments = restic_arguments;
    if let Some(cache) = cli.cache {
        settings.cache_directory = cache;
    }
    settings
}

fn run(settings: Settings, config_file: PathBuf) -> Result<(), ToolError> {
    let file = File::open(&config_file).map_err(config::ConfigError::from)?;
    let config = ConfigResolver::new().resolve_reader(file)?;

    let runtime = DockerRuntime::new()?;
    ResticTool::new(settings, config, runtime).run()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging_config =
        LoggingConfig::from_verbosity(cli.verbose).with_log_directory(cli.log_dir.clone());
    let _log_guard = match init_logging(&logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let config_file = cli
        .config
        .as_deref()
        .map(config::expand_tilde)
        .unwrap_or_else(settings::default_configuration_file);

    match run(settings_from(cli), config_file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !matches!(e, ToolError::EngineExecution { .. }) {
                error!("{}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}
