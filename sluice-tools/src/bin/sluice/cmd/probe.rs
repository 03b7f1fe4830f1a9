use std::process::ExitCode;

use sluice::{BridgeMode, BridgeRegistry, ConnectionArgs, Soc};

#[derive(clap::Args)]
pub struct Cmd {
    /// List the chip's bridge controllers with their exposure
    #[arg(short = 'l', long)]
    list_interfaces: bool,

    /// Probe only INTERFACE
    #[arg(short, long, value_name = "INTERFACE")]
    interface: Option<String>,

    /// Requirement to probe for; the exit status reports whether it holds
    #[arg(short, long, value_enum)]
    require: Option<Requirement>,

    /// INTERFACE [HOST PORT USERNAME PASSWORD]
    #[arg(num_args = 0..=5)]
    connection: Vec<String>,
}

#[derive(clap::ValueEnum, Debug, Copy, Clone)]
enum Requirement {
    /// No bridge may allow writes from the outside.
    Integrity,
    /// No bridge may allow any access from the outside.
    Confidentiality,
}

pub fn run(cmd: Cmd, registry: &BridgeRegistry) -> anyhow::Result<ExitCode> {
    let args = ConnectionArgs::from_positional(&cmd.connection)?;
    let mut bridge = registry.connect(args.as_ref())?;
    let mut soc = Soc::probe(&mut bridge)?;

    if cmd.list_interfaces {
        for row in soc.list_bridge_controllers()? {
            println!("{:<8} {}", row.name, row.mode);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let discovered = soc.probe_bridge_controllers(cmd.interface.as_deref())?;
    println!("{discovered}");

    let required = match cmd.require {
        None => BridgeMode::Permissive,
        Some(Requirement::Integrity) => BridgeMode::Restricted,
        Some(Requirement::Confidentiality) => BridgeMode::Disabled,
    };

    if required <= discovered {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
