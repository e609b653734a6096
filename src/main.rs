use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use pubsync::config::{config_path, load_from_path, ExcludeDef, PublishConfig, ReplaceDef};
use pubsync::{
    logging, publish, sync_file, FileSyncStatus, FolderOutcome, FolderReport, MirrorReport,
    PublishOptions, RunReport, SyncOptions,
};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pubsync")]
#[command(about = "Publish project folders to a target tree using publish profiles", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the publish config (default: <root>/pubsync.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Working root that folder paths are relative to (default: current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every configured folder to a profile's publishing path
    Sync {
        /// Profile name
        profile: String,

        /// Keep files that exist only in the destination
        #[arg(long)]
        no_delete: bool,

        /// Dry run - classify files without changing anything
        #[arg(short = 'n', long)]
        no_sync: bool,

        /// Print external mirror tool command lines
        #[arg(long)]
        show_commands: bool,

        /// Emit the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Publish a single file
    File {
        /// Profile name
        profile: String,

        /// File to publish (must be under the working root)
        path: PathBuf,

        /// Dry run - report whether the file would be updated
        #[arg(short = 'n', long)]
        no_sync: bool,
    },

    /// List profiles and folders from the config
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let root = match cli.root {
        Some(root) => root,
        None => env::current_dir().context("cannot determine current directory")?,
    };
    let config_path = config_path(&root, cli.config.as_deref());

    // stdout carries only the report under --json
    let json_output = matches!(cli.command, Commands::Sync { json: true, .. });

    let succeeded = match cli.command {
        Commands::Sync {
            profile,
            no_delete,
            no_sync,
            show_commands,
            json,
        } => {
            let options = SyncOptions {
                sync_files: !no_sync,
                no_delete,
            };
            cmd_sync(&config_path, &root, &profile, options, show_commands, json)?
        }

        Commands::File {
            profile,
            path,
            no_sync,
        } => {
            let options = SyncOptions {
                sync_files: !no_sync,
                ..SyncOptions::default()
            };
            cmd_file(&config_path, &root, &profile, &path, options)?
        }

        Commands::List => cmd_list(&config_path)?,
    };

    if succeeded {
        if !json_output {
            println!("{}", "Sync finished.".green());
        }
        Ok(())
    } else {
        eprintln!("{}", "Sync failed.".red());
        std::process::exit(1);
    }
}

fn load_config(path: &Path) -> Result<PublishConfig> {
    let config = load_from_path(path)?;
    Ok(config)
}

fn print_separator() {
    println!("{}", "=".repeat(78).dimmed());
    println!();
}

fn print_folder_report(report: &FolderReport) {
    if report.source_missing {
        println!(
            "{}",
            format!(
                "Folder '{}' does not exist on the source.",
                report.source.display()
            )
            .yellow()
        );
        return;
    }
    if report.dry_run {
        println!("{}", "[DRY RUN - nothing was changed]".cyan());
    }
    println!("Skipped: {}", report.unchanged);
    println!("New: {}", format!("{}", report.new).green());
    println!("Changed: {}", format!("{}", report.changed).yellow());
    println!("Deleted: {}", format!("{}", report.deleted).cyan());
    let errors = format!("{}", report.error_count());
    if report.is_success() {
        println!("Errors: {}", errors);
    } else {
        println!("Errors: {}", errors.red());
        for failure in &report.errors {
            eprintln!("  {} {}: {}", "✗".red(), failure.path, failure.message);
        }
    }
    println!("Time: {:?}", report.elapsed);
}

fn print_mirror_report(report: &MirrorReport, show_commands: bool) {
    if show_commands || !report.ran {
        println!("{}", report.command_line.dimmed());
    }
    if !report.ran {
        println!("{}", "[DRY RUN - mirror tool not started]".cyan());
        return;
    }
    if !report.output.is_empty() {
        println!("{}", report.output);
    }
    println!("Time: {:?}", report.elapsed);
}

fn print_run(run: &RunReport, show_commands: bool) {
    println!("Publishing path: {}", run.publishing_path.display());
    println!();
    for outcome in &run.folders {
        println!("{}", outcome.folder().bold());
        println!("{}", "-".repeat(78).dimmed());
        match outcome {
            FolderOutcome::Synced { report, .. } => print_folder_report(report),
            FolderOutcome::Mirrored { report, .. } => print_mirror_report(report, show_commands),
            FolderOutcome::Failed { reason, .. } => {
                eprintln!("{} {}", "✗".red(), reason);
            }
        }
        print_separator();
    }
}

fn cmd_sync(
    config_path: &Path,
    root: &Path,
    profile: &str,
    options: SyncOptions,
    show_commands: bool,
    json: bool,
) -> Result<bool> {
    let config = load_config(config_path)?;
    let options = PublishOptions {
        sync: options,
        ..PublishOptions::default()
    };

    let run = publish(&config, profile, root, options)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print_run(&run, show_commands);
    }

    Ok(run.is_success())
}

fn cmd_file(
    config_path: &Path,
    root: &Path,
    profile: &str,
    path: &Path,
    options: SyncOptions,
) -> Result<bool> {
    let config = load_config(config_path)?;

    match sync_file(&config, profile, root, path, options) {
        Ok(outcome) => {
            println!("File: {}", outcome.relative);
            println!("Destination: {}", outcome.destination.display());
            let result = match outcome.status {
                FileSyncStatus::Identical => "Source is identical to destination.".normal(),
                FileSyncStatus::Updated => "File updated!".green(),
                FileSyncStatus::WouldUpdate => "File would be updated.".cyan(),
            };
            println!("Result: {}", result);
            Ok(true)
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            Ok(false)
        }
    }
}

fn print_rules(exclude: &[ExcludeDef], replace: &[ReplaceDef]) {
    for rule in exclude {
        println!(
            "    exclude '{}' ({:?}, {}{})",
            rule.expression,
            rule.kind,
            rule.location,
            if rule.invert { ", inverted" } else { "" }
        );
    }
    for rule in replace {
        println!("    replace '{}' -> '{}'", rule.expression, rule.replacement);
    }
}

fn cmd_list(config_path: &Path) -> Result<bool> {
    let config = load_config(config_path)?;

    println!("{}", "Profiles:".bold());
    for profile in &config.profiles {
        println!("  {} -> {}", profile.name.green(), profile.publishing_path);
        print_rules(&profile.exclude, &profile.replace);
    }
    println!();

    println!("{}", "Folders:".bold());
    for folder in &config.folders {
        let levels = folder
            .levels
            .map(|l| format!(", {l} levels"))
            .unwrap_or_default();
        println!("  {} ({:?}{})", folder.path.cyan(), folder.copy_method, levels);
        print_rules(&folder.exclude, &folder.replace);
    }

    Ok(true)
}
