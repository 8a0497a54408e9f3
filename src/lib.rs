// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod frontend;
pub mod logging;
pub mod relay;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::ConfigFile;
use crate::relay::CommandRouter;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + environment overrides)
/// - the process supervisor
/// - the command router and its allow-list
/// - the console front end
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    // Only the implicit default path may be missing.
    let (config_path, allow_missing) = match &args.config {
        Some(path) => (PathBuf::from(path), false),
        None => (default_config_path(), true),
    };
    let cfg = load_and_validate(&config_path, allow_missing)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    info!(
        allowed_users = cfg.allow_list().len(),
        repo_path = ?cfg.repo_path(),
        "relay starting"
    );

    let router = Arc::new(CommandRouter::new(
        cfg.operations().iter().cloned(),
        cfg.allow_list().clone(),
        cfg.supervisor().clone(),
    ));

    let input = BufReader::new(tokio::io::stdin());
    let out = Arc::new(Mutex::new(tokio::io::stdout()));

    // Ctrl-C → stop accepting commands, let in-flight ones finish.
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    frontend::serve(router, input, out, shutdown).await
}

/// Simple dry-run output: print the resolved operations.
fn print_dry_run(cfg: &ConfigFile) {
    println!("relaybot dry-run");
    println!("  allowed users = {}", cfg.allow_list().len());
    if let Some(repo) = cfg.repo_path() {
        println!("  repo_path = {}", repo.display());
    }
    println!(
        "  grace_period = {:?}, watcher_join_timeout = {:?}",
        cfg.supervisor().grace_period,
        cfg.supervisor().watcher_join_timeout
    );
    println!();

    println!("operations ({}):", cfg.operations().len());
    for op in cfg.operations() {
        let spec = &op.spec;
        println!("  - {}", op.command);
        println!("      cmd: {}", spec.command);
        if let Some(ref dir) = spec.working_dir {
            println!("      working_dir: {}", dir.display());
        }
        println!("      timeout: {:?}", spec.timeout);
        println!("      on_timeout: {:?}", spec.timeout_policy);
        if let Some(ref trigger) = spec.trigger {
            println!("      trigger: {trigger:?}");
        }
    }

    debug!("dry-run complete (no commands accepted)");
}
