//! `radarfuse` – multi-sensor positioning monitor.
//!
//! This binary drives the fusion stack from the command line.  It:
//!
//! 1. Loads `~/.radarfuse/config.toml` (or `$RADARFUSE_CONFIG`), falling back
//!    to a built-in two-radar demo layout when the file is absent.
//! 2. Mounts every configured sensor into a
//!    [`PositioningEngine`][radarfuse_runtime::PositioningEngine].
//! 3. Runs one positioning cycle per configured interval and prints the fused
//!    positions.
//! 4. Intercepts **Ctrl-C** to stop and release every sensor before exiting.
//!
//! `radarfuse init` writes the demo layout to the config path instead.

mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use radarfuse_hal::TracingObserver;
use radarfuse_perception::ClusterOptions;
use radarfuse_runtime::telemetry::{init_tracing, TelemetryConfig};
use radarfuse_runtime::PositioningEngine;
use radarfuse_types::{FusionError, Point3};
use tokio::time::MissedTickBehavior;
use tracing::warn;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Must come before the Tokio runtime is built (simple OTLP exporter).
    let _guard = init_tracing(&TelemetryConfig::from_env("radarfuse"));

    print_banner();

    match std::env::args().nth(1).as_deref() {
        None | Some("run") => {}
        Some("init") => {
            write_default_config();
            return;
        }
        Some(other) => {
            println!("{}: unknown command '{other}'", "Error".red());
            println!("  Usage: radarfuse [run | init]");
            std::process::exit(2);
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            println!(
                "  No config at {}; using the demo layout.",
                config::config_path().display().to_string().dimmed()
            );
            config::Config::default()
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using the demo layout.");
            config::Config::default()
        }
    };

    let engine = match cfg.build_engine(Arc::new(TracingObserver)) {
        Ok(engine) => engine,
        Err(e) => {
            println!("{}: {}", "Cannot build positioning engine".red(), e);
            std::process::exit(1);
        }
    };

    println!(
        "  {} sensor(s), radius {}, every {} ms\n",
        engine.array().len(),
        engine.cluster_radius(),
        engine.interval().as_millis()
    );

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping sensors …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; sensors will only be released after max_cycles");
    }

    // ── Polling loop ──────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            println!("{}: {}", "Cannot start runtime".red(), e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(engine, cfg.cluster, cfg.max_cycles, shutdown));
    match result {
        Ok(cycles) => println!(
            "  {} {} cycle(s) completed; sensors released.",
            "✓".green().bold(),
            cycles
        ),
        Err(e) => {
            println!("{}: {}", "Shutdown error".red(), e);
            std::process::exit(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Polling loop
// ─────────────────────────────────────────────────────────────────────────────

/// Start the engine, run one positioning cycle per interval until `shutdown`
/// is raised or `max_cycles` (if non-zero) is reached, then shut it down.
///
/// A failed cycle is logged and the loop continues.  Returns the number of
/// cycles attempted.
async fn run(
    mut engine: PositioningEngine,
    options: ClusterOptions,
    max_cycles: u64,
    shutdown: Arc<AtomicBool>,
) -> Result<u64, FusionError> {
    engine.start()?;

    let mut ticker = tokio::time::interval(engine.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cycles = 0u64;
    while !shutdown.load(Ordering::SeqCst) {
        ticker.tick().await;
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match engine.positioning(None, &options) {
            Ok(positions) => print_positions(cycles, &positions),
            Err(e) => warn!(cycle = cycles, error = %e, "positioning cycle failed"),
        }

        cycles += 1;
        if max_cycles > 0 && cycles >= max_cycles {
            break;
        }
    }

    engine.shutdown()?;
    Ok(cycles)
}

fn print_positions(cycle: u64, positions: &[Point3]) {
    println!(
        "  [{}] cycle {} – {} position(s)",
        chrono::Local::now().format("%H:%M:%S%.3f").to_string().dimmed(),
        cycle,
        positions.len().to_string().bold()
    );
    for p in positions {
        println!("    • ({:>7.3}, {:>7.3}, {:>7.3})", p.x, p.y, p.z);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// `init` command
// ─────────────────────────────────────────────────────────────────────────────

fn write_default_config() {
    let path = config::config_path();
    if path.exists() {
        println!(
            "  {} already exists; leaving it untouched.",
            path.display().to_string().bold()
        );
        return;
    }
    match config::save_to(&config::Config::default(), &path) {
        Ok(()) => println!(
            "  {} Demo layout written to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        ),
        Err(e) => println!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "radarfuse".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Multi-sensor point-cloud fusion & positioning");
    println!();
}
