mod config;
mod scan_cmd;
mod status_cmd;
mod terminal_output;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kkscan_gateway::{start_server, AppState};
use kkscan_logging::{init_console_logger, init_logger};
use kkscan_media::ImageIntake;
use tracing::info;

use config::{build_extractor, init_config, render_redacted, Settings};
use scan_cmd::{ScanArgs, ScanOutput};
use terminal_output::{note_error, note_info, note_success};

#[derive(Parser)]
#[command(name = "kkscan")]
#[command(about = "Kartu Keluarga scanner: extract, review and export family card data")]
#[command(version)]
struct Cli {
    /// Config file (default: $KKSCAN_CONFIG_DIR/config.yaml or ~/.kkscan/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Extract one image and print an export
    Scan(ScanArgs),
    /// Show whether a server is running
    Status,
    /// Print the effective configuration with secrets masked
    Config {
        /// Write a starter config file instead
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        note_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config).await?;

    match cli.command {
        Commands::Serve { port, bind } => {
            init_logger(settings.log_dir(), settings.config.log_level());
            run_server(&settings, port, bind).await?;
        }
        Commands::Scan(args) => {
            init_console_logger(settings.config.log_level());
            let config = &settings.config;
            let extractor = build_extractor(config)?;
            let intake = ImageIntake::new(config.max_upload_bytes());
            let default_out = config.output_dir().map(PathBuf::as_path);
            match scan_cmd::execute(extractor.as_ref(), intake, &args, default_out).await? {
                ScanOutput::Stdout(text) => println!("{text}"),
                ScanOutput::File(path) => note_success(&format!("Saved {}", path.display())),
            }
        }
        Commands::Status => {
            init_console_logger(settings.config.log_level());
            status_cmd::run(&settings.config).await?;
        }
        Commands::Config { init: true } => {
            init_config(&settings.path).await?;
            note_success(&format!("Wrote {}", settings.path.display()));
        }
        Commands::Config { init: false } => {
            note_info(&format!("Config file: {}", settings.path.display()));
            let (yaml, masked) = render_redacted(&settings.config)?;
            if !masked.is_empty() {
                note_info(&format!("Masked: {}", masked.join(", ")));
            }
            print!("{yaml}");
        }
    }

    Ok(())
}

/// `bind` is a bare IP address, v4 or v6 (brackets optional).
fn socket_addr(bind: &str, port: u16) -> Result<SocketAddr> {
    let host = bind.trim().trim_start_matches('[').trim_end_matches(']');
    let ip: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid bind address {bind}"))?;
    Ok(SocketAddr::new(ip, port))
}

async fn run_server(settings: &Settings, port: Option<u16>, bind: Option<String>) -> Result<()> {
    let config = &settings.config;
    let bind = bind.unwrap_or_else(|| config.bind().to_string());
    let port = port.unwrap_or(config.port());
    let addr = socket_addr(&bind, port)?;

    let extractor = build_extractor(config)?;
    info!(
        addr = %addr,
        model = %config.model(),
        max_upload_bytes = config.max_upload_bytes(),
        "Starting kkscan gateway"
    );

    let state = Arc::new(AppState::from_config(config, extractor));
    start_server(addr, state, config.allowed_origins()).await
}
