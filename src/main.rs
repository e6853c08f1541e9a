use anyhow::{Context, Result};
use backup_warden::config::{self, BackupPolicy, ConfigError};
use backup_warden::managers::logging::{self, LoggingConfig};
use backup_warden::{FilesystemProbe, InstanceLock, RealProbe, RetentionEngine};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "backup-warden")]
#[command(about = "Disk-space-aware backup retention daemon", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/backup-warden.conf")]
    config: PathBuf,

    /// Seconds to sleep between eviction rounds
    #[arg(long, default_value_t = 30)]
    poll_interval: u64,

    /// Seconds to wait for a mount to respond before skipping its policy
    #[arg(long, default_value_t = 10)]
    probe_timeout: u64,

    /// Directory for log files (defaults to ~/logs)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level for the log file (console always logs at info)
    #[arg(long, default_value = "debug")]
    log_level: String,

    /// Maximum number of rotated log files to keep
    #[arg(long, default_value_t = 10)]
    log_max_files: u32,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Evaluate all policies and evict artifacts until convergence
    Run,

    /// Parse and validate the configuration file
    Validate,

    /// Write the default configuration template
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    // If no command specified, run retention
    let command = cli.command.clone().unwrap_or(Commands::Run);

    let result = match command {
        Commands::InitConfig { force } => {
            logging::init_console_logging();
            handle_init_config(&cli, force)
        }
        Commands::Validate => {
            logging::init_console_logging();
            handle_validate(&cli)
        }
        Commands::Run => {
            // Full logging with file rotation (must keep guard alive)
            let log_dir = cli
                .log_dir
                .clone()
                .unwrap_or_else(|| LoggingConfig::default().log_directory);
            let logging_config =
                LoggingConfig::from_values(&log_dir, &cli.log_level, cli.log_max_files);
            match logging::init_logging(&logging_config) {
                Ok(_guard) => handle_run(&cli),
                Err(e) => {
                    eprintln!("Failed to initialize logging: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Load policies, generating the config template when no file exists yet.
fn load_or_bootstrap(cli: &Cli, probe: &dyn FilesystemProbe) -> Result<Vec<BackupPolicy>> {
    let path = config::expand_tilde(&cli.config);
    match config::load_policies(&path, probe, Duration::from_secs(cli.probe_timeout)) {
        Err(ConfigError::MissingConfig(_)) => {
            config::write_default_config(&path)
                .with_context(|| format!("Failed to write config template to {:?}", path))?;
            anyhow::bail!(
                "No config file found; wrote a template to {:?}. \
                 Edit it to declare your retention policies, then run again",
                path
            );
        }
        other => other.with_context(|| format!("Invalid configuration in {:?}", path)),
    }
}

/// Handle the run command
fn handle_run(cli: &Cli) -> Result<()> {
    // One instance per config file; concurrent runs could race list-then-delete
    // and evict past a policy's floor.
    let lock_key = cli
        .config
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("default");
    let _lock =
        InstanceLock::acquire(lock_key).context("Failed to acquire single-instance lock")?;

    let probe = Arc::new(RealProbe::new().context("Failed to initialize filesystem probe")?);
    let policies = load_or_bootstrap(cli, probe.as_ref())?;

    info!(
        "Loaded {} retention {} from {:?}",
        policies.len(),
        if policies.len() == 1 { "policy" } else { "policies" },
        cli.config
    );

    let engine = RetentionEngine::new(
        policies,
        probe,
        Duration::from_secs(cli.poll_interval),
        Duration::from_secs(cli.probe_timeout),
    );
    engine.run()?;

    info!("Retention run complete");
    Ok(())
}

/// Handle the validate command
fn handle_validate(cli: &Cli) -> Result<()> {
    let probe = RealProbe::new().context("Failed to initialize filesystem probe")?;
    let policies = load_or_bootstrap(cli, &probe)?;

    println!("Configuration is valid!");
    println!("Policies: {}", policies.len());
    for policy in &policies {
        println!(
            "  [{}] {} artifacts in {} (limit {}%, keep {} to {})",
            policy.name,
            policy.kind,
            policy.directory.display(),
            policy.disk_limit_percent,
            policy.min_backups,
            policy.max_backups
        );
    }

    Ok(())
}

/// Handle the init-config command
fn handle_init_config(cli: &Cli, force: bool) -> Result<()> {
    let path = config::expand_tilde(&cli.config);

    if path.exists() && !force {
        anyhow::bail!(
            "Config file {:?} already exists (use --force to overwrite)",
            path
        );
    }

    config::write_default_config(&path)
        .with_context(|| format!("Failed to write config template to {:?}", path))?;

    info!("Wrote config template to {:?}", path);
    info!("Edit it to declare your retention policies, then run 'backup-warden run'");
    Ok(())
}
