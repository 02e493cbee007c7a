// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use gws::{
    config::{
        default_definition, definition_path, resolve_definition, write_definition,
        DefinitionOrigin, ResourceSpec, SyncDefinition, DEFINITION_FILE_NAME,
    },
    path::{global_definition_path, resolve_against},
    report::{describe_outcome, SyncTally},
    sync::{check_sync_status, missing_resources, synchronize_with_progress, SyncOutcome},
    worktree::{Git2Worktrees, WorktreeAccess},
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    env::current_dir,
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  gws [options] <gws-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        match self.command {
            Command::Init(opts) => run_init(opts),
            Command::Create(opts) => run_create(opts),
            Command::Sync(opts) => run_sync(opts),
            Command::List(opts) => run_list(opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Write default sync definition in current directory.
    #[command(override_usage = "gws init [options]")]
    Init(InitOptions),

    /// Create new worktree and synchronize resources into it.
    #[command(override_usage = "gws create [options] <branch_name>")]
    Create(CreateOptions),

    /// Synchronize resources from main worktree into existing worktree.
    #[command(override_usage = "gws sync [options] [<worktree_path>]")]
    Sync(SyncOptions),

    /// List worktrees and their sync status.
    #[command(override_usage = "gws list [options]")]
    List(ListOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Overwrite existing sync definition.
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CreateOptions {
    /// Name of new branch to check out in new worktree.
    #[arg(required = true, value_name = "branch_name")]
    pub branch: String,

    /// Path of new worktree instead of configured worktree path.
    #[arg(short, long, value_name = "path")]
    pub path: Option<PathBuf>,

    /// Copy symlink resources instead of linking them.
    #[arg(short, long)]
    pub copy: bool,

    /// Skip resource synchronization.
    #[arg(long)]
    pub no_sync: bool,

    /// Branch to start new branch from instead of HEAD.
    #[arg(short, long, value_name = "branch")]
    pub base: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncOptions {
    /// Worktree to synchronize, defaults to current directory.
    #[arg(value_name = "worktree_path")]
    pub path: Option<PathBuf>,

    /// Copy symlink resources instead of linking them.
    #[arg(short, long)]
    pub copy: bool,

    /// Overwrite existing resources (not implemented yet).
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ListOptions {
    /// Show missing resources of unsynced worktrees.
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_init(opts: InitOptions) -> Result<()> {
    let path = definition_path(current_dir()?);
    if path.exists() && !opts.force {
        bail!("{DEFINITION_FILE_NAME} already exists, use --force to overwrite");
    }

    write_definition(&path, &default_definition())?;
    info!("created {DEFINITION_FILE_NAME}");
    info!("edit {DEFINITION_FILE_NAME} to customize resource sync settings");

    Ok(())
}

fn run_create(opts: CreateOptions) -> Result<()> {
    let worktrees = Git2Worktrees::discover(current_dir()?)?;
    if worktrees.branch_exists(&opts.branch) {
        bail!("branch {:?} already exists", opts.branch);
    }

    let main = worktrees.main_worktree()?;
    let definition = load_definition(&main)?;
    let path = match opts.path {
        Some(path) => path,
        None => definition.resolve_worktree_path(&opts.branch),
    };
    let path = resolve_against(&main, &path);

    info!("creating worktree at {:?}", path.display());
    worktrees.create_worktree(&opts.branch, &path, opts.base.as_deref())?;

    if !opts.no_sync {
        info!("synchronizing resources");
        let outcomes = synchronize_with_spinner(&definition.resources, &main, &path, opts.copy)?;
        report_outcomes(&outcomes, false)?;
    }

    info!("done! run: cd {}", path.display());

    Ok(())
}

fn run_sync(opts: SyncOptions) -> Result<()> {
    let target = match opts.path {
        Some(path) => path,
        None => current_dir()?,
    };

    let worktrees = Git2Worktrees::discover(&target)?;
    let main = worktrees.main_worktree()?;
    let target = worktrees
        .current_worktree()
        .map(Path::to_path_buf)
        .unwrap_or(target);

    if target.components().eq(main.components()) {
        info!("{:?} is the main worktree, nothing to sync", target.display());
        return Ok(());
    }

    let definition = load_definition(&main)?;
    info!("syncing from main worktree {:?}", main.display());
    let outcomes = synchronize_with_spinner(&definition.resources, &main, &target, opts.copy)?;
    let synced = report_outcomes(&outcomes, opts.force)?;

    if synced > 0 {
        info!("sync complete!");
    } else {
        info!("all resources already synced!");
    }

    Ok(())
}

fn run_list(opts: ListOptions) -> Result<()> {
    let worktrees = Git2Worktrees::discover(current_dir()?)?;
    let main = worktrees.main_worktree()?;
    let listing = worktrees.list_worktrees()?;

    let definition = match load_definition(&main) {
        Ok(definition) => definition,
        Err(err) => {
            warn!("failed to load sync definition: {err:?}");
            default_definition()
        }
    };

    let repository = main
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| main.display().to_string());
    info!("worktrees for repository {repository:?}");

    let mut synced = 0;
    let mut unsynced = 0;
    for worktree in &listing {
        let branch = worktree.branch.as_deref().unwrap_or("(detached)");
        let path = worktree.path.display().to_string();

        if worktree.is_main {
            info!("  {branch:<20} {path:<40} (main worktree)");
            continue;
        }

        let is_synced = check_sync_status(&definition.resources, &worktree.path);
        let (icon, status) = if is_synced {
            synced += 1;
            ("✓", "(synced)")
        } else {
            unsynced += 1;
            ("✗", "(not synced)")
        };
        info!("{icon} {branch:<20} {path:<40} {status}");

        if opts.verbose {
            print_missing(&definition.resources, &worktree.path);
        }
    }

    info!(
        "total: {} worktrees ({synced} synced, {unsynced} not synced)",
        listing.len()
    );

    if unsynced > 0 {
        info!("run 'gws sync <path>' to sync unsynced worktrees");
    }

    Ok(())
}

fn print_missing(resources: &ResourceSpec, worktree: &Path) {
    let missing = missing_resources(resources, worktree);
    if missing.is_empty() {
        info!("    resources: all synced");
    } else {
        info!("    missing: {}", missing.join(", "));
    }
}

fn load_definition(main: &Path) -> Result<SyncDefinition> {
    let global = global_definition_path().ok();
    let (definition, origin) = resolve_definition(main, global.as_deref())?;

    match origin {
        DefinitionOrigin::BuiltIn => {
            warn!("no {DEFINITION_FILE_NAME} found in main worktree, using default configuration");
            info!("run 'gws init' to create a sync definition");
        }
        origin => debug!("using sync definition from {origin}"),
    }

    Ok(definition)
}

fn synchronize_with_spinner(
    resources: &ResourceSpec,
    source: &Path,
    dest: &Path,
    force_copy: bool,
) -> Result<Vec<SyncOutcome>> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    bar.enable_steady_tick(Duration::from_millis(100));

    let outcomes = synchronize_with_progress(resources, source, dest, force_copy, |resource| {
        bar.set_message(resource.to_string());
    });
    bar.finish_and_clear();

    Ok(outcomes)
}

/// Render each outcome, and count resources that were linked or copied.
///
/// Fails once everything is rendered if any resource failed for a reason
/// other than being absent from the main worktree.
fn report_outcomes(outcomes: &[SyncOutcome], force: bool) -> Result<usize> {
    for outcome in outcomes {
        match describe_outcome(outcome, force) {
            (Level::ERROR, line) => error!("{line}"),
            (Level::WARN, line) => warn!("{line}"),
            (Level::INFO, line) => info!("{line}"),
            (_, line) => debug!("{line}"),
        }
    }

    Ok(SyncTally::new(outcomes).into_result()?)
}
