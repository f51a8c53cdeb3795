//! pvmerge command-line tool.
//!
//! Scans a mods directory for `pv_db` manifests, reports id and title
//! conflicts between packages, disables the losing declarations and restores
//! manifests from backup.

mod resolve;
mod scan;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pvmerge_core::config::AppConfig;
use pvmerge_core::pipeline::{MergeEngine, ResolveOptions};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// pvmerge command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "pvmerge",
    version,
    about = "Detect and resolve pv_db conflicts between mod packages"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "pvmerge.toml")]
    config: PathBuf,

    /// Log at debug level (RUST_LOG still wins).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./pvmerge.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,

    /// Detect conflicts and show the removal plans without changing anything.
    Scan {
        /// List every member of every conflict group.
        #[arg(long)]
        details: bool,

        /// Write the conflict report as JSON to this path.
        #[arg(long, value_name = "JSON")]
        export: Option<PathBuf>,
    },

    /// Disable losing declarations in the affected manifests.
    Resolve {
        /// Report what would change without touching any file.
        #[arg(long)]
        dry_run: bool,

        /// Restore every manifest from backup before scanning.
        #[arg(long)]
        restore_first: bool,
    },

    /// Restore every manifest from its backup.
    Restore,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging("warn", cli.verbose);
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging("warn", cli.verbose);
            cmd_validate(&cli.config)
        }
        Commands::Scan { details, export } => {
            let engine = load_engine(&cli.config, cli.verbose)?;
            scan::run(&engine, details, export.as_deref())
        }
        Commands::Resolve {
            dry_run,
            restore_first,
        } => {
            let engine = load_engine(&cli.config, cli.verbose)?;
            resolve::run_resolve(
                &engine,
                ResolveOptions {
                    dry_run,
                    restore_first,
                },
            )
        }
        Commands::Restore => {
            let engine = load_engine(&cli.config, cli.verbose)?;
            resolve::run_restore(&engine)
        }
    }
}

fn load_engine(config_path: &Path, verbose: bool) -> Result<MergeEngine> {
    let config = load_config(config_path)?;
    init_logging(&config.log.level, verbose);
    debug!(config = %config_path.display(), "configuration loaded");
    Ok(MergeEngine::new(config))
}

/// `RUST_LOG` wins; otherwise `-v` selects debug, else `level`.
fn init_logging(level: &str, verbose: bool) {
    let fallback = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_validate(path).context("failed to load configuration file")
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"# pvmerge configuration
# Relative paths are resolved against the directory holding this file.

[catalog]
# Directory with one sub-directory per mod package.
mods_dir = "mods"
manifest_name = "mod_pv_db.txt"
manifest_parent = "rom"
# Read the package order from the mod loader's config.toml instead of
# [priority] order.
# loader_config = "config.toml"

[priority]
# Earlier packages win conflicts.
order = []
# Priority of packages missing from the order. Lower wins.
default_priority = 9999

[resolution]
backup_dir = ".pvmerge/backups"
dry_run = false
# Packages that are scanned but never modified.
exempt = []
# Glob patterns of packages to leave out entirely.
ignore = []

[log]
level = "info"
"#;

fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }
    std::fs::write(output, DEFAULT_CONFIG).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Point mods_dir at your mods directory");
    println!("  2. List your packages under [priority] order, highest priority first");
    println!("  3. Validate with: pvmerge validate --config {}", output.display());
    println!("  4. Preview with:  pvmerge scan --config {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let config = AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    let priorities = match config.priority_table() {
        Ok(table) => {
            println!("  [OK] Priority order loaded ({} package(s))", table.len());
            table
        }
        Err(e) => {
            println!("  [FAIL] Priority order: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    };

    let mods_dir = config.mods_dir();
    if mods_dir.is_dir() {
        println!("  [OK] Mods directory exists");
    } else {
        println!("  [WARN] Mods directory not found: {}", mods_dir.display());
    }

    println!();
    println!("Configuration summary:");
    println!("  Mods directory  : {}", mods_dir.display());
    println!(
        "  Manifest        : {}/{}",
        config.catalog.manifest_parent, config.catalog.manifest_name
    );
    println!(
        "  Priority source : {}",
        match &config.catalog.loader_config {
            Some(path) => config.resolve_path(path).display().to_string(),
            None => "[priority] order".to_string(),
        }
    );
    println!("  Ordered packages: {}", priorities.len());
    println!("  Default priority: {}", priorities.default_priority());
    println!("  Backup directory: {}", config.backup_dir().display());
    println!("  Dry run         : {}", config.resolution.dry_run);
    println!(
        "  Exempt          : {}",
        display_list(&config.resolution.exempt)
    );
    println!(
        "  Ignore          : {}",
        display_list(&config.resolution.ignore)
    );
    println!();
    println!("Configuration is valid.");
    Ok(())
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
