//! profilesync command-line tool.
//!
//! Provides subcommands for generating and validating configuration files,
//! previewing conflicts between the local and remote profile, reconciling
//! them, and creating, switching, listing and deleting remote profiles.

mod prompt;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use profilesync_core::config::{StrategySetting, SyncConfig};
use profilesync_core::conflict::{Conflict, Side, Strategy};
use profilesync_core::sync_engine::{Outcome, SyncEngine};
use profilesync_core::tree::render_value;

use crate::prompt::DialoguerPrompter;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// profilesync command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "profilesync",
    version,
    about = "Reconcile an editor profile between this machine and a remote document"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        short,
        long,
        global = true,
        default_value = "~/.config/profilesync/config.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "~/.config/profilesync/config.toml")]
        output: String,
    },

    /// Validate a configuration file.
    Validate,

    #[command(flatten)]
    Engine(EngineCommands),
}

/// Commands that need a loaded configuration.
#[derive(Subcommand, Debug)]
enum EngineCommands {
    /// Show conflicts between the local and remote profile without changing anything.
    Diff {
        /// Profile to compare (defaults to the active profile, then `sync.profile`).
        #[arg(short, long)]
        profile: Option<String>,

        /// Print conflicts as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the local and remote profile.
    Sync {
        /// Profile to reconcile (defaults to the active profile, then `sync.profile`).
        #[arg(short, long)]
        profile: Option<String>,

        /// Override the configured resolution strategy.
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage the profiles stored in the remote document.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// List remote profiles.
    List,
    /// Publish the current local settings as a new profile.
    Create {
        /// Name of the new profile.
        name: String,

        /// Mark the profile as the default one.
        #[arg(long)]
        default: bool,

        /// Tags to attach (repeatable).
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Apply a remote profile to this machine.
    Switch {
        /// Profile to switch to.
        name: String,
    },
    /// Delete a remote profile.
    Delete {
        /// Profile to delete.
        name: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    PreferLocal,
    PreferRemote,
    PreferNewer,
    Manual,
    Ask,
}

impl From<StrategyArg> for StrategySetting {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::PreferLocal => StrategySetting::PreferLocal,
            StrategyArg::PreferRemote => StrategySetting::PreferRemote,
            StrategyArg::PreferNewer => StrategySetting::PreferNewer,
            StrategyArg::Manual => StrategySetting::Manual,
            StrategyArg::Ask => StrategySetting::Ask,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{:#}", e)));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = expand_tilde(&cli.config);

    let command = match cli.command {
        Commands::Init { output } => {
            init_logging("warn");
            return cmd_init(&expand_tilde(&output));
        }
        Commands::Validate => {
            init_logging("warn");
            return cmd_validate(&config_path);
        }
        Commands::Engine(command) => command,
    };

    let config = load_config(&config_path)?;
    init_logging(&config.sync.log_level);
    let engine = build_engine(&config);

    match command {
        EngineCommands::Diff { profile, json } => cmd_diff(&engine, &config, profile, json).await,
        EngineCommands::Sync {
            profile,
            strategy,
            json,
        } => {
            let engine = match strategy {
                Some(strategy) => engine.with_strategy(strategy.into()),
                None => engine,
            };
            cmd_sync(&engine, &config, profile, json).await
        }
        EngineCommands::Profile { action } => cmd_profile(&engine, &config, action).await,
    }
}

/// Minimal logging for the CLI. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<SyncConfig> {
    SyncConfig::load_and_validate(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn build_engine(config: &SyncConfig) -> SyncEngine {
    SyncEngine::from_config(config, Arc::new(DialoguerPrompter))
}

/// Profile to operate on: the explicit flag, then the profile active on this
/// machine, then `sync.profile`.
fn target_profile(engine: &SyncEngine, config: &SyncConfig, flag: Option<String>) -> Result<String> {
    if let Some(name) = flag {
        return Ok(name);
    }
    let active = engine
        .active_profile()
        .context("failed to read the active profile")?;
    Ok(active.unwrap_or_else(|| config.sync.profile.clone()))
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!("{}", style::warn("Init cancelled. Existing file was not modified."));
            return Ok(());
        }
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("failed to create config directory")?;
        }
    }
    std::fs::write(output, SyncConfig::default_toml()).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Set [remote] document_id to your profile document");
    println!(
        "  2. Validate with: profilesync validate --config {}",
        output.display()
    );
    println!("  3. Preview with: profilesync diff");

    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config =
        SyncConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("{}", style::success("TOML structure is valid"));

    if let Err(e) = config.validate() {
        println!("{}", style::error(&format!("Validation error: {}", e)));
        anyhow::bail!("configuration validation failed");
    }
    println!("{}", style::success("All required fields are valid"));

    let ignored = if config.sync.ignored_paths.is_empty() {
        "none".to_string()
    } else {
        config.sync.ignored_paths.join(", ")
    };

    println!();
    println!("{}", style::header("Configuration summary"));
    println!("  Profile        : {}", config.sync.profile);
    println!("  Strategy       : {}", config.sync.strategy);
    println!("  Ignored paths  : {}", ignored);
    println!("  Settings file  : {}", config.local.settings_path.display());
    println!("  Extensions file: {}", config.local.extensions_path.display());
    println!("  Document id    : {}", config.remote.document_id);
    println!("  Remote store   : {}", config.remote.store_dir.display());
    println!();
    println!("Configuration is valid.");

    Ok(())
}

async fn cmd_diff(
    engine: &SyncEngine,
    config: &SyncConfig,
    profile: Option<String>,
    json: bool,
) -> Result<()> {
    let profile = target_profile(engine, config, profile)?;
    let conflicts = engine
        .diff(&profile)
        .await
        .with_context(|| format!("failed to compare profile '{}'", profile))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!();
        println!("{}", style::success(&format!("Profile '{}' is in sync", profile)));
        println!();
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Conflicts in '{}' ({})", profile, conflicts.len()))
    );
    println!();
    println!("{}", conflict_table(&conflicts));
    println!();
    println!(
        "{}",
        style::dim("Run `profilesync sync` to resolve them, or add paths to sync.ignored_paths.")
    );

    Ok(())
}

async fn cmd_sync(
    engine: &SyncEngine,
    config: &SyncConfig,
    profile: Option<String>,
    json: bool,
) -> Result<()> {
    let profile = target_profile(engine, config, profile)?;
    let report = engine
        .reconcile(&profile)
        .await
        .with_context(|| format!("failed to reconcile profile '{}'", profile))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", style::outcome(&report.outcome));
    if !report.conflicts.is_empty() {
        println!("  Conflicts : {}", report.conflicts.len());
        println!("  Ignored   : {}", report.ignored);
    }
    println!(
        "  {}",
        style::dim(&format!("run {} at {}", report.id, report.completed_at))
    );
    println!();

    if matches!(report.outcome, Outcome::Aborted { .. }) {
        println!(
            "{}",
            style::dim("Rerun with --strategy to resolve without prompting.")
        );
    }

    Ok(())
}

async fn cmd_profile(engine: &SyncEngine, config: &SyncConfig, action: ProfileAction) -> Result<()> {
    match action {
        ProfileAction::List => {
            let names = engine
                .list_profiles()
                .await
                .context("failed to list remote profiles")?;

            if names.is_empty() {
                println!("{}", style::warn("The remote document holds no profiles."));
                return Ok(());
            }

            let active = target_profile(engine, config, None)?;
            println!();
            println!("{}", style::header(&format!("Remote profiles ({})", names.len())));
            println!();
            for name in &names {
                if *name == active {
                    println!("  {} {}", name, style::dim("(active)"));
                } else {
                    println!("  {}", name);
                }
            }
            println!();
            Ok(())
        }

        ProfileAction::Create {
            name,
            default,
            tags,
        } => {
            let profile = engine
                .create_profile(&name, default, tags)
                .await
                .with_context(|| format!("failed to create profile '{}'", name))?;
            println!(
                "{}",
                style::success(&format!(
                    "Profile '{}' created with {} extension(s)",
                    profile.profile_name,
                    profile.extensions.len()
                ))
            );
            Ok(())
        }

        ProfileAction::Switch { name } => {
            let profile = engine
                .switch_profile(&name)
                .await
                .with_context(|| format!("failed to switch to profile '{}'", name))?;
            println!(
                "{}",
                style::success(&format!("Switched to profile '{}'", profile.profile_name))
            );
            if !profile.extensions.is_empty() {
                println!(
                    "{}",
                    style::dim(&format!(
                        "{} extension(s) listed; install any that are missing from the editor.",
                        profile.extensions.len()
                    ))
                );
            }
            Ok(())
        }

        ProfileAction::Delete { name, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete remote profile '{}'?", name))
                    .default(false)
                    .interact()
                    .context("failed to read confirmation")?;
                if !confirmed {
                    println!("{}", style::warn("Delete cancelled."));
                    return Ok(());
                }
            }
            engine
                .delete_profile(&name)
                .await
                .with_context(|| format!("failed to delete profile '{}'", name))?;
            println!("{}", style::success(&format!("Profile '{}' deleted", name)));
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn conflict_table(conflicts: &[Conflict]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Path", "Kind", "Local", "Remote", "Newer"]);

    for c in conflicts {
        let newer = match Strategy::PreferNewer.decide(c) {
            Some(Side::Local) if c.local_timestamp == c.remote_timestamp => "tie".to_string(),
            Some(Side::Local) => style::local(),
            Some(Side::Remote) => style::remote(),
            None => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(c.dotted_path()),
            Cell::new(c.kind.to_string()),
            Cell::new(truncate(&render_value(c.local_value.as_ref()), 40)),
            Cell::new(truncate(&render_value(c.remote_value.as_ref()), 40)),
            Cell::new(newer),
        ]);
    }

    table
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
