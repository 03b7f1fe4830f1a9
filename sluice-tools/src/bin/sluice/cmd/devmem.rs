use std::process::ExitCode;

use sluice::{Ahb, BridgeRegistry, ConnectionArgs};

#[derive(clap::Args)]
pub struct Cmd {
    #[command(subcommand)]
    op: Op,
}

#[derive(clap::Subcommand)]
enum Op {
    /// Read one 32-bit word
    Read {
        /// Bus address to read
        #[arg(value_parser = super::parse_u32)]
        address: u32,
    },
    /// Write one 32-bit word
    Write {
        /// Bus address to write
        #[arg(value_parser = super::parse_u32)]
        address: u32,

        /// Value to write
        #[arg(value_parser = super::parse_u32)]
        value: u32,
    },
}

pub fn run(cmd: Cmd, registry: &BridgeRegistry) -> anyhow::Result<ExitCode> {
    let args = ConnectionArgs::Local {
        interface: "devmem".into(),
    };
    let mut bridge = registry.connect(Some(&args))?;

    match cmd.op {
        Op::Read { address } => {
            let value = bridge.read32(address)?;
            println!("{address:#010x}: {value:#010x}");
        }
        Op::Write { address, value } => {
            bridge.write32(address, value)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
