mod downsample;
mod encode;
mod io;
mod opts;
mod plot;
mod stream;
mod summary;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "simtrace",
    about = "Incremental downsampling of circuit simulation traces"
)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Downsample a sample feed into plot rows
    Downsample(downsample::Opts),
    /// Generate an HTML plot from a sample feed
    Plot(plot::Opts),
    /// Follow a growing feed and emit new rows as they materialize
    Stream(stream::Opts),
    /// Summarize a sample feed
    Summary(summary::Opts),
    /// Transcode samples between encodings
    Encode(encode::Opts),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "simtrace=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Downsample(opts) => downsample::downsample(&opts).await,
        Command::Plot(opts) => plot::plot(&opts).await,
        Command::Stream(opts) => stream::stream(&opts).await,
        Command::Summary(opts) => summary::summary(&opts).await,
        Command::Encode(opts) => encode::encode(&opts).await,
    }
}
