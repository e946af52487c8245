use arduino_connector::config::ConfigLoader;
use arduino_connector::port::{SerialPlatform, SystemPlatform};
use arduino_connector::{logging, SerialConnector};
use clap::Parser;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Talk to an Arduino-class board over a serial port.",
    long_about = "Opens the port exclusively at 9600 8N1. Lines typed on stdin are sent to the device; lines received from the device are printed on stdout."
)]
struct Args {
    /// Port name or alias to connect to. Overrides `serial.port` from the config.
    #[arg(short, long)]
    port: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List the ports the registry can see and exit.
    #[arg(short, long)]
    list: bool,

    /// Only consider this device path. May be repeated.
    #[arg(long = "scan-path", value_name = "PATH")]
    scan_paths: Vec<String>,

    /// Milliseconds to wait for a busy port.
    #[arg(long)]
    open_timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();
    if !args.scan_paths.is_empty() {
        config.serial.scan_paths = args.scan_paths.clone();
    }
    if let Some(ms) = args.open_timeout_ms {
        config.serial.open_timeout_ms = ms;
    }
    config.validate()?;

    logging::init(&config.logging);

    let platform = SystemPlatform::with_scan_paths(config.serial.scan_paths.clone());
    if args.list {
        return list_ports(&platform);
    }

    let requested = args
        .port
        .or_else(|| config.serial.port.clone())
        .ok_or("no port given: pass --port or set serial.port in the config")?;
    let port = config.serial.resolve_port(&requested);

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connector = SerialConnector::builder(port)
        .owner_label(config.serial.owner_label.clone())
        .open_timeout(config.serial.open_timeout())
        .poll_interval(config.serial.poll_interval())
        .platform(platform)
        .connect(move |line: String| {
            let _ = tx.send(line);
        })?;
    let connector = Arc::new(connector);

    // A plain thread, so a pending stdin read cannot hold up shutdown.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    thread::spawn(move || forward_lines(std::io::stdin().lock(), &input_tx));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(line) = rx.recv() => println!("{}", line),
            input = input_rx.recv() => match input {
                Some(text) => {
                    // send() blocks on the serial driver
                    let writer = Arc::clone(&connector);
                    let sent = tokio::task::spawn_blocking(move || writer.send_line(&text)).await?;
                    if let Err(e) = sent {
                        error!(error = %e, "Send failed");
                    }
                }
                None => break,
            },
            _ = &mut shutdown => break,
        }
    }

    let closer = Arc::clone(&connector);
    tokio::task::spawn_blocking(move || closer.close()).await?;
    Ok(())
}

/// Send each input line to `tx` until input ends or the receiver is gone.
fn forward_lines(input: impl BufRead, tx: &mpsc::UnboundedSender<String>) {
    for line in input.lines() {
        match line {
            Ok(text) => {
                if tx.send(text).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

fn list_ports(platform: &SystemPlatform) -> Result<(), Box<dyn std::error::Error>> {
    let ports = platform.ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }
    for port in ports {
        println!("{}\t{}", port.name, port.kind);
    }
    Ok(())
}

// --- Graceful Shutdown Handler ---
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, closing serial connector");
}
