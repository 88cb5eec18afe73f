use clap::Parser;
use tracing::error;
use trezor_transport::{enumerate, find_by_path};

#[derive(Parser, Debug)]
#[command(author, version, about = "List Trezor devices attached over WebUSB", long_about = None)]
struct Args {
    /// Open this device path to verify access, instead of listing
    #[arg(long)]
    path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    if let Some(path) = &args.path {
        let transport = find_by_path(path)?;
        transport.open()?;
        transport.close();
        println!(
            "{path}: {} (protocol v{}) ok",
            transport.identity(),
            transport.protocol().version()
        );
        return Ok(());
    }

    let transports = enumerate()?;
    if transports.is_empty() {
        println!("No devices found");
        return Ok(());
    }
    for transport in transports {
        println!(
            "{}  {} (protocol v{})",
            transport.path(),
            transport.identity(),
            transport.protocol().version()
        );
    }
    Ok(())
}
