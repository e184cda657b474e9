/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use modbus_poller::config::ConfigDefaults;
use modbus_poller::diagnostics::{self, ConfigReport};
use modbus_poller::model::{Millis, Operation, Slave};
use modbus_poller::scheduler::PollScheduler;
use modbus_poller::util::try_parse_int;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Accepts `1000` as well as `0x3E8`.
fn parse_i32(s: &str) -> Result<i32, String> {
    try_parse_int(s)
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| format!("'{}' is not a 32-bit decimal or 0x-prefixed hex integer", s))
}

/// Modbus polling scheduler.
///
/// Example:
///   modbus-poller -c demos/slaves.json --print -t 10 -r 10000
#[derive(Debug, Parser)]
#[command(
    name = "modbus-poller",
    about = "Loads a JSON slave/operation configuration and dispatches due polls",
    long_about = None,
)]
struct Cli {
    /// Path to the JSON slave configuration.
    #[arg(short = 'c', long = "config")]
    config: PathBuf,

    /// Host loop period in milliseconds.
    #[arg(short = 't', long = "tick-ms", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Stop after this many milliseconds (runs until Ctrl-C when omitted).
    #[arg(short = 'r', long = "run-for-ms")]
    run_for_ms: Option<u64>,

    /// Print the loaded configuration before polling.
    #[arg(short = 'p', long = "print", default_value_t = false)]
    print: bool,

    /// Print the loaded configuration as JSON and exit.
    #[arg(long = "dump-json", default_value_t = false)]
    dump_json: bool,

    /// Slave polling interval (ms) used when `PollingInterval` is absent.
    #[arg(long = "default-polling-interval", value_parser = parse_i32)]
    default_polling_interval: Option<i32>,

    /// Retry count used when `RetryCount` is absent.
    #[arg(long = "default-retry-count", value_parser = parse_i32)]
    default_retry_count: Option<i32>,

    /// Baud rate used when `BaudRate` is absent.
    #[arg(long = "default-baud-rate", value_parser = parse_i32)]
    default_baud_rate: Option<i32>,

    /// TCP port used when `TcpPort` is absent.
    #[arg(long = "default-tcp-port", value_parser = parse_i32)]
    default_tcp_port: Option<i32>,

    /// Serial line setting used when `Config` is absent.
    #[arg(long = "default-serial-config")]
    default_serial_config: Option<String>,
}

impl Cli {
    fn defaults(&self) -> ConfigDefaults {
        let mut d = ConfigDefaults::default();
        if let Some(v) = self.default_polling_interval {
            d.polling_interval = v;
        }
        if let Some(v) = self.default_retry_count {
            d.retry_count = v;
        }
        if let Some(v) = self.default_baud_rate {
            d.baud_rate = v;
        }
        if let Some(v) = self.default_tcp_port {
            d.tcp_port = v;
        }
        if let Some(v) = &self.default_serial_config {
            d.serial_config = v.clone();
        }
        d
    }
}

/// Wrapping 32-bit millisecond counter since `start`.
fn now_millis(start: Instant) -> Millis {
    start.elapsed().as_millis() as Millis
}

/// Stand-in transport: reports the poll instead of performing it.
fn log_poll(slave: &Slave, op: &Operation) -> anyhow::Result<()> {
    info!(
        kind = %slave.modbus_type,
        connection = %slave.connection,
        unit_id = op.unit_id,
        function = op.function,
        address = op.address,
        len = op.len,
        "poll {:?}",
        op.display_name
    );
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        config     = %cli.config.display(),
        tick_ms    = cli.tick_ms,
        run_for_ms = ?cli.run_for_ms,
        "Configuration"
    );

    // ── Load slave configuration ──────────────────────────────────────────────
    let mut scheduler = PollScheduler::new(cli.defaults());
    if let Err(e) = scheduler.load_from_file(&cli.config) {
        error!("Failed to load polling configuration: {:#}", e);
        process::exit(1);
    }

    if cli.dump_json {
        match diagnostics::to_json(scheduler.slaves()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialise configuration: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    if cli.print {
        print!("{}", ConfigReport::new(scheduler.slaves()));
    } else {
        diagnostics::log_config(scheduler.slaves());
    }

    scheduler.set_callback(log_poll);

    // ── Host loop ─────────────────────────────────────────────────────────────
    let start = Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_millis(cli.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let run_for = cli.run_for_ms.map(Duration::from_millis);
    let deadline = async move {
        match run_for {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut total = 0usize;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                total += scheduler.tick(now_millis(start));
            }
            _ = &mut deadline => {
                info!("Run time elapsed");
                break;
            }
            _ = &mut shutdown => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!(polls = total, "Stopped");
}
