//! `dragcare` – offline driver for the anchor-tracking engine.
//!
//! Perception streams recorded as JSON scenarios are replayed through a
//! [`Session`][dragcare_tracking::Session] backed by the recording
//! [`SimRenderer`], and the resulting scene mutations are printed.
//!
//! # Subcommands
//!
//! - `replay <SCENARIO>` – replay a scenario; `--json` prints the full trace.
//! - `init` – write the default `~/.dragcare/config.toml`.
//! - `config` – print the effective configuration (file + env overrides).

mod config;
mod scenario;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dragcare_render::{AssetLibrary, SceneCommand, SimRenderer};
use tracing::{error, info};

use crate::config::Config;
use crate::scenario::{Replay, Scenario};

#[derive(Parser, Debug)]
#[command(name = "dragcare", version, about = "Replay perception streams through the anchor tracker")]
struct Cli {
    /// Config file (defaults to `~/.dragcare/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded scenario and print the scene commands it produced.
    Replay {
        scenario: PathBuf,
        /// Emit the full replay trace as JSON.
        #[arg(long)]
        json: bool,
        /// Extra directory of `.usdz` models to make available.
        #[arg(long)]
        assets: Option<PathBuf>,
    },
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> ExitCode {
    let _guard = telemetry::init_tracing("dragcare");
    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(config::config_path);

    let result = match cli.command {
        Command::Replay { scenario, json, assets } => {
            run_replay(&path, &scenario, json, assets.as_deref())
        }
        Command::Init { force } => run_init(&path, force),
        Command::Config => run_config(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run_replay(
    config_path: &Path,
    scenario_path: &Path,
    json: bool,
    extra_assets: Option<&Path>,
) -> Result<(), String> {
    let cfg = config::load_or_default(config_path)?;
    let scenario = Scenario::load(scenario_path).map_err(|e| e.to_string())?;
    let library = build_asset_library(&cfg, extra_assets)?;
    info!(
        steps = scenario.steps.len(),
        assets = library.len(),
        "replaying scenario"
    );

    let replay = scenario.replay(cfg.tracking, SimRenderer::with_assets(library));

    if json {
        let out = serde_json::to_string_pretty(&replay)
            .map_err(|e| format!("Failed to serialize replay: {}", e))?;
        println!("{out}");
    } else {
        print_banner();
        print_replay(&replay);
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> Result<(), String> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    config::save_to(&Config::default(), path)?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn run_config(path: &Path) -> Result<(), String> {
    let cfg = config::load_or_default(path)?;
    print!("{}", config::to_toml(&cfg)?);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Assets from the configured directory, the configured names, and the
/// `--assets` directory.
fn build_asset_library(cfg: &Config, extra_dir: Option<&Path>) -> Result<AssetLibrary, String> {
    let mut library = AssetLibrary::new();
    for dir in cfg.asset_dir.as_deref().into_iter().chain(extra_dir) {
        let found = AssetLibrary::from_dir(dir).map_err(|e| e.to_string())?;
        for name in found.names() {
            library.register(name);
        }
    }
    for name in &cfg.assets {
        library.register(name);
    }
    Ok(library)
}

fn print_replay(replay: &Replay) {
    if let Some(name) = &replay.name {
        println!("  Scenario {}", name.bold());
        println!();
    }

    for step in &replay.steps {
        println!(
            "  {} {:>6} ms  {:<8} {} detection(s)",
            format!("#{}", step.index).dimmed(),
            step.at_ms,
            step.event.to_string().cyan(),
            step.detections
        );
        for command in &step.commands {
            println!("      {}", describe(command));
        }
    }

    if !replay.teardown.is_empty() {
        println!("  {}", "teardown".cyan());
        for command in &replay.teardown {
            println!("      {}", describe(command));
        }
    }

    let stats = &replay.report.stats;
    println!();
    println!("  {}", "Session report".bold());
    println!("    events              {}", stats.events);
    println!("    ignored             {}", stats.ignored);
    println!("    skipped             {}", stats.skipped);
    println!("    winner changes      {}", stats.winner_changes);
    println!("    refreshes           {}", stats.refreshes);
    println!("    deferred recomputes {}", stats.deferred_recomputations);
    println!("    attached / detached {} / {}", stats.attached, stats.detached);
    if stats.unvisualized > 0 {
        println!("    {}        {}", "unvisualized".yellow(), stats.unvisualized);
    }
    if stats.invariant_violations > 0 {
        println!("    {} {}", "invariant violations".red(), stats.invariant_violations);
    }
    println!();
}

fn describe(command: &SceneCommand) -> String {
    match command {
        SceneCommand::Create { entity, spec } => {
            format!("{} {} ({})", "create".green(), entity, spec.shape())
        }
        SceneCommand::Add { entity } => format!("{} {}", "add".green(), entity),
        SceneCommand::Remove { entity } => format!("{} {}", "remove".red(), entity),
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"     _                                    "#.bold().cyan());
    println!("{}", r#"  __| |_ __ __ _  __ _  ___ __ _ _ __ ___ "#.bold().cyan());
    println!("{}", r#" / _` | '__/ _` |/ _` |/ __/ _` | '__/ _ \"#.bold().cyan());
    println!("{}", r#"| (_| | | | (_| | (_| | (_| (_| | | |  __/"#.bold().cyan());
    println!("{}", r#" \__,_|_|  \__,_|\__, |\___\__,_|_|  \___|"#.bold().cyan());
    println!("{}", r#"                 |___/                    "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "dragcare".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Spatial anchor tracking replay");
    println!();
}
