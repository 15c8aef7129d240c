use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use secure_wipe::system::is_root;
use secure_wipe::ui::{self, ProgressBar};
use secure_wipe::wipe::{SessionSnapshot, SessionState};
use secure_wipe::wipe_orchestrator::{CancelOutcome, WipeConfirmation};
use secure_wipe::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "secure-wipe")]
#[command(about = "Classify storage devices and run supervised secure wipes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true, env = "SECURE_WIPE_CONFIG")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan and classify storage devices
    Scan {
        /// Show evidence trail and recommended commands for every device
        #[arg(short, long)]
        verbose: bool,

        /// Write the analysis report to a file
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// Show privileges, cached devices and tool availability
    Status,

    /// Show detailed information for one device
    Device {
        /// Device path (e.g., /dev/sda)
        path: String,
    },

    /// Erase a device with the command for its classification
    Wipe {
        /// Device path (e.g., /dev/sdb)
        path: String,

        /// Skip the typed confirmation (DANGEROUS!)
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);
    if !cfg!(feature = "color-output") {
        colored::control::set_override(false);
    }
    setup_signal_handlers()?;

    if !is_root() && !cli.json {
        eprintln!("{}", "⚠️  Warning: Not running as root.".yellow());
        eprintln!("   Some device information may be limited and wipes will fail.");
        eprintln!();
    }

    let config = EngineConfig::load(cli.config.as_deref())?;
    let orchestrator = WipeOrchestrator::with_system(config);

    match &cli.command {
        Commands::Scan { verbose, export } => {
            scan_devices(&orchestrator, *verbose, export.as_deref(), cli.json).await
        }
        Commands::Status => show_status(&orchestrator, cli.json).await,
        Commands::Device { path } => show_device(&orchestrator, path, cli.json).await,
        Commands::Wipe { path, yes } => wipe_device(&orchestrator, path, *yes, cli.json).await,
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn scan_devices(
    orchestrator: &WipeOrchestrator,
    verbose: bool,
    export: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    if !json {
        println!("🔍 Scanning storage devices...");
    }
    let outcome = orchestrator.scan().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if !outcome.success() {
        bail!("{}", outcome.message());
    } else if outcome.devices().is_empty() {
        println!("ℹ️  No storage devices found.");
    } else {
        println!("✅ {}:", outcome.message());
        println!();
        for (i, device) in outcome.devices().iter().enumerate() {
            if verbose {
                print_device_detailed(i + 1, device);
            } else {
                print!("{}", ui::render_device_summary(device));
            }
        }
        if !verbose {
            println!("\n💡 Use --verbose for detailed information");
        }
    }

    if let Some(path) = export {
        let report = ui::render_report(outcome.devices(), chrono::Local::now());
        std::fs::write(path, report)
            .with_context(|| format!("Could not save report to {}", path.display()))?;
        if !json {
            println!("📄 Report exported to {}", path.display());
        }
    }

    Ok(())
}

fn print_device_detailed(index: usize, device: &ClassifiedDevice) {
    println!("{}", ui::render_device_colored(index, device));
}

async fn show_status(orchestrator: &WipeOrchestrator, json: bool) -> Result<()> {
    let status = orchestrator.status().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("🔧 System Status");
    println!("{}", "=".repeat(40));
    if status.is_root {
        println!("✅ Root privileges: Available");
    } else {
        println!("❌ Root privileges: Missing");
    }
    println!("📊 Cached devices: {}", status.cached_devices);

    println!("\n🛠️  System Tools:");
    for tool in &status.tools.tools {
        let icon = if tool.available { "✅" } else { "❌" };
        println!("   {} {}", icon, tool.name);
    }
    println!(
        "\n📈 Tools available: {}/{}",
        status.tools.available_count(),
        status.tools.tools.len()
    );
    let missing = status.tools.missing();
    if !missing.is_empty() {
        println!("{}", format!("⚠️  Missing tools: {}", missing.join(", ")).yellow());
    }
    Ok(())
}

async fn show_device(orchestrator: &WipeOrchestrator, path: &str, json: bool) -> Result<()> {
    let outcome = orchestrator.scan().await?;
    if !outcome.success() {
        bail!("{}", outcome.message());
    }

    let Some(device) = orchestrator.get_device(path) else {
        bail!("Device {} not found", path);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&device)?);
    } else {
        print_device_detailed(1, &device);
    }
    Ok(())
}

async fn wipe_device(orchestrator: &WipeOrchestrator, path: &str, yes: bool, json: bool) -> Result<()> {
    let outcome = orchestrator.scan().await?;
    if !outcome.success() {
        bail!("{}", outcome.message());
    }
    let Some(device) = orchestrator.get_device(path) else {
        bail!("Device {} not found", path);
    };

    // With --json stdout carries only the final snapshot
    let section = ui::render_device_colored(1, &device);
    if !device.classification.is_actionable() {
        eprintln!("{}", section);
        bail!(
            "Refusing to wipe {}: classification is {}, verify the device manually",
            device.path,
            device.classification
        );
    }

    let banner = "⚠️  WARNING: THIS WILL PERMANENTLY DESTROY ALL DATA".red().bold();
    if json {
        eprintln!("{}\n{}", banner, section);
    } else {
        println!("{}\n{}", banner, section);
    }

    let confirmation = if yes {
        WipeConfirmation::for_device(device.path.clone())
    } else {
        read_confirmation(&device.path, &mut io::stdin().lock(), &mut io::stderr())?
    };
    if is_interrupted() {
        bail!("Operation cancelled by user");
    }

    let session = orchestrator.start_wipe(&device, &confirmation)?;
    tracing::info!(session = %session.id(), "Wipe session started");

    let snapshot = follow_session(orchestrator, json).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_final(&snapshot);
    }

    match snapshot.state {
        SessionState::Completed => Ok(()),
        SessionState::Cancelled => bail!("Wipe cancelled"),
        _ => bail!(
            "Wipe failed: {}",
            snapshot.message.as_deref().unwrap_or("unknown error")
        ),
    }
}

/// Ask the operator to type the device path; the prompt goes to `prompt`, never stdout
fn read_confirmation(
    device_path: &str,
    input: &mut impl BufRead,
    prompt: &mut impl Write,
) -> io::Result<WipeConfirmation> {
    write!(prompt, "Type the device path ({}) to confirm: ", device_path)?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(WipeConfirmation::for_device(line.trim()))
}

/// Render progress until the session ends; Ctrl+C triggers cancellation
async fn follow_session(orchestrator: &WipeOrchestrator, json: bool) -> SessionSnapshot {
    let mut bar = ProgressBar::new(48);
    let mut cancel_sent = false;
    loop {
        if is_interrupted() && !cancel_sent {
            cancel_sent = true;
            match orchestrator.cancel_wipe().await {
                CancelOutcome::Cancelled(snapshot) => return snapshot,
                CancelOutcome::AlreadyFinished(state) => {
                    tracing::info!(%state, "Session finished before cancellation");
                }
                CancelOutcome::NothingToCancel => {}
            }
        }

        let snapshot = orchestrator.poll_session();
        if !json {
            bar.render(&snapshot);
        }
        if snapshot.state.is_terminal() {
            return snapshot;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

fn print_final(snapshot: &SessionSnapshot) {
    let elapsed = humantime::format_duration(Duration::from_secs(snapshot.elapsed_secs as u64));
    println!();
    match snapshot.state {
        SessionState::Completed => {
            println!("{}", "✅ Wipe completed successfully".green().bold());
            println!(
                "   {} written in {}",
                ui::human_bytes(snapshot.bytes_copied as f64),
                elapsed
            );
        }
        SessionState::Cancelled => {
            println!("{}", "🛑 Wipe cancelled".yellow().bold());
            println!(
                "   The device is partially erased and its previous contents are unrecoverable."
            );
            println!("   Run the wipe again to finish erasing it.");
        }
        _ => {
            println!("{}", "❌ Wipe failed".red().bold());
            if let Some(message) = &snapshot.message {
                println!("   {}", message);
            }
        }
    }
}

// Signal handler for graceful cancellation
fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{consts::SIGINT, iterator::Signals};

    let mut signals = Signals::new([SIGINT])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT {
                eprintln!("\n\n🛑 Interrupt received! Cancelling wipe...");
                secure_wipe::set_interrupted();
            }
        }
    });

    Ok(())
}
