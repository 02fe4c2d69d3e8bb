// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod gateway;
pub mod input;
pub mod logging;
pub mod relay;
pub mod scratch;
pub mod service;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, token_from_env, ConfigFile};
use crate::exec::ProcessBackend;
use crate::fs::RealFileSystem;
use crate::gateway::TelegramGateway;
use crate::relay::{Relay, RelaySettings};
use crate::scratch::ScratchWriter;
use crate::service::{BotService, ServiceSettings, StopSignal};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and the bot token
/// - the Telegram gateway
/// - scratch writer, worker backend and relay
/// - the bot service
/// - SIGINT / SIGTERM handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref().map(Path::new))?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Fatal before any connection is attempted.
    let token = token_from_env(&cfg.bot.token_env)?;

    let gateway = Arc::new(TelegramGateway::new(&cfg.bot, &token)?);
    let worker = Arc::new(ProcessBackend::new(cfg.worker.clone()));
    let scratch = ScratchWriter::new(Arc::new(RealFileSystem), cfg.scratch.clone());

    let relay = Arc::new(Relay::new(
        gateway.clone(),
        worker,
        scratch,
        RelaySettings::from_config(&cfg),
    ));

    let service = BotService::new(gateway, relay, ServiceSettings::from(&cfg.bot));
    let handle = service.start();

    tokio::spawn(stop_on_signal(handle.stop_signal()));

    handle.stopped().await?;
    info!("relaybot exiting");
    Ok(())
}

/// Stop the service on the first SIGINT or SIGTERM.
#[cfg(unix)]
async fn stop_on_signal(stop: StopSignal) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut interrupt, mut terminate) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(i), Ok(t)) => (i, t),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to install signal handlers");
                return;
            }
        };

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    };
    info!(signal = name, "stopping bot service");
    stop.stop();
}

#[cfg(not(unix))]
async fn stop_on_signal(stop: StopSignal) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        return;
    }
    info!(signal = "ctrl-c", "stopping bot service");
    stop.stop();
}

/// Print the effective configuration without connecting anywhere.
fn print_dry_run(cfg: &ConfigFile) {
    println!("relaybot dry-run");
    println!("  bot.token_env = {}", cfg.bot.token_env);
    println!("  bot.api_url = {}", cfg.bot.api_url);
    println!("  bot.poll_timeout = {:?}", cfg.bot.poll_timeout);
    println!();

    println!("worker:");
    println!("  program: {}", cfg.worker.program);
    println!("  args: {:?}", cfg.worker.args);
    println!("  cwd: {}", cfg.worker.cwd.display());
    println!("  timeout: {:?}", cfg.worker.timeout);
    println!("  kill_grace: {:?}", cfg.worker.kill_grace);
    println!("  input_env: {}", cfg.worker.input_env);
    println!("  max_reply_chars: {}", cfg.worker.max_reply_chars);
    println!();

    println!("scratch:");
    println!("  mode: {:?}", cfg.scratch.mode);
    println!("  path: {}", cfg.scratch.path.display());
    println!("  dir: {}", cfg.scratch.dir.display());

    debug!("dry-run complete (no connection)");
}
