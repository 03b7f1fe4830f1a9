use std::process::ExitCode;

use anyhow::bail;
use sluice::{Ahb, BridgeRegistry, ConnectionArgs, SiphonFault, Soc};

#[derive(clap::Args)]
pub struct Cmd {
    #[command(subcommand)]
    target: Target,
}

#[derive(clap::Subcommand)]
enum Target {
    /// Load stdin into RAM
    Ram {
        /// Load address; defaults to the DRAM base
        #[arg(short = 'S', long, value_parser = super::parse_u32)]
        start: Option<u32>,

        /// INTERFACE [HOST PORT USERNAME PASSWORD]
        #[arg(num_args = 0..=5)]
        connection: Vec<String>,
    },
}

pub fn run(cmd: Cmd, registry: &BridgeRegistry) -> anyhow::Result<ExitCode> {
    let Target::Ram { start, connection } = cmd.target;

    let args = ConnectionArgs::from_positional(&connection)?;
    let mut bridge = registry.connect(args.as_ref())?;
    let mut soc = Soc::probe(&mut bridge)?;

    let dram = soc.dram();
    let start = start.unwrap_or(dram.start());
    if !dram.contains(start) {
        bail!("load address {start:#010x} is not contained in DRAM {dram}");
    }

    // Accept anything up to the end of DRAM; shorter input ends the load.
    let length = (dram.end() - start as u64) as u32;

    let mut stdin = std::io::stdin().lock();
    match soc.ahb().siphon_in(start, length, &mut stdin) {
        Ok(transferred) => tracing::info!("loaded {} bytes at {:#010x}", transferred, start),
        Err(error) => match error.fault {
            SiphonFault::ShortInput { .. } => {
                tracing::info!("input ended after {} bytes", error.transferred);
            }
            _ => return Err(error.into()),
        },
    }

    Ok(ExitCode::SUCCESS)
}
