mod decode;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use astropix::DecodeOpts;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DecodeArgs {
    /// Size of each hit record in bytes, including the 1 byte marker.
    #[arg(short, long, default_value_t = 5)]
    data_bytes: usize,

    /// Sample clock period in nanoseconds, used to convert ToT counts to microseconds.
    #[arg(short, long, default_value_t = 5)]
    sampleclock_period_ns: u32,
}

impl DecodeArgs {
    fn opts(&self) -> DecodeOpts {
        DecodeOpts::builder()
            .data_bytes(self.data_bytes)
            .sampleclock_period_ns(self.sampleclock_period_ns)
            .build()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a readout stream file into hit rows.
    ///
    /// Rows are written to the input path with its extension replaced by .txt, one
    /// hit per row:
    ///
    /// line readout id payload location is_col timestamp tot_msb tot_lsb tot_total tot_us
    Decode {
        #[command(flatten)]
        args: DecodeArgs,

        /// Input readout stream file, e.g., a .dat file written by the DAQ.
        input: PathBuf,
    },
    /// Show decode statistics for a readout stream file without writing any output.
    Info {
        #[command(flatten)]
        args: DecodeArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Input readout stream file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("ASTROPIX_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Decode { args, input } => decode::decode(input, &args.opts()),
        Commands::Info {
            args,
            format,
            input,
        } => info::info(input, &args.opts(), format),
    }
}
