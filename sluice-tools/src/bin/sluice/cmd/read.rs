use std::io::Write as _;
use std::process::ExitCode;

use anyhow::bail;
use sluice::{Ahb, BridgeRegistry, ConnectionArgs, Soc, SocRegion};

#[derive(clap::Args)]
pub struct Cmd {
    #[command(subcommand)]
    target: Target,
}

#[derive(clap::Subcommand)]
enum Target {
    /// Dump RAM to stdout
    ///
    /// Without an explicit range the whole of DRAM is dumped, minus the
    /// VRAM reservation at its tail.
    Ram {
        /// Start address of the region to dump
        #[arg(short = 'S', long, value_parser = super::parse_u32, requires = "length")]
        start: Option<u32>,

        /// Length of the region to dump
        #[arg(short = 'L', long, value_parser = super::parse_u32, requires = "start")]
        length: Option<u32>,

        /// INTERFACE [HOST PORT USERNAME PASSWORD]
        #[arg(num_args = 0..=5)]
        connection: Vec<String>,
    },
}

pub fn run(cmd: Cmd, registry: &BridgeRegistry) -> anyhow::Result<ExitCode> {
    let Target::Ram {
        start,
        length,
        connection,
    } = cmd.target;

    let args = ConnectionArgs::from_positional(&connection)?;
    let mut bridge = registry.connect(args.as_ref())?;
    let mut soc = Soc::probe(&mut bridge)?;

    let dram = soc.dram();
    let vram = soc.vram();

    let (start, length) = match (start, length) {
        (Some(start), Some(length)) => {
            let want = SocRegion::new(start, length)?;
            if !dram.contains_region(&want) {
                bail!("requested range {want} is not contained in DRAM {dram}");
            }

            tracing::info!(
                "dumping {} MiB ({:#010x}-{:#010x})",
                length >> 20,
                start,
                start as u64 + length as u64 - 1,
            );
            (start, length)
        }
        _ => {
            let length = dram.length() - vram.length();

            tracing::info!(
                "{} MiB DRAM with {} MiB VRAM; dumping {} MiB ({:#010x}-{:#010x})",
                dram.length() >> 20,
                vram.length() >> 20,
                length >> 20,
                dram.start(),
                vram.start() - 1,
            );
            (dram.start(), length)
        }
    };

    let mut stdout = std::io::stdout().lock();
    let transferred = soc.ahb().siphon_out(start, length, &mut stdout)?;
    stdout.flush()?;

    tracing::info!("dumped {} bytes", transferred);
    Ok(ExitCode::SUCCESS)
}
