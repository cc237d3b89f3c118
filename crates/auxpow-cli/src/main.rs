use clap::{Parser, Subcommand};
use tracing::{error, subscriber::set_global_default};
use tracing_subscriber::filter::EnvFilter;

mod config;
mod inspect;
mod verify;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Logging level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Clone, Debug)]
enum Commands {
    /// Verify a merged-mining proof for an auxiliary block hash
    Verify(verify::VerifyArgs),
    /// Check the proof of work of a serialized auxiliary header
    Block(verify::BlockArgs),
    /// Parse the merge-mining commitment out of a coinbase script
    Scan(inspect::ScanArgs),
    /// Compute the chain merkle slot assigned to a chain id
    Slot(inspect::SlotArgs),
    /// Decode an 80-byte block header
    Header(inspect::HeaderArgs),
}

fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();
    set_global_default(subscriber)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(&cli.log_level) {
        eprintln!("failed to install logger: {err}");
        std::process::exit(1);
    }

    let res = match cli.command {
        Commands::Verify(args) => verify::run(args),
        Commands::Block(args) => verify::run_block(args),
        Commands::Scan(args) => inspect::scan(args),
        Commands::Slot(args) => inspect::slot(args),
        Commands::Header(args) => inspect::header(args),
    };

    if let Err(err) = res {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
