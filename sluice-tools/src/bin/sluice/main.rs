mod cmd;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use sluice::BridgeRegistry;

#[derive(Parser)]
#[command(
    name = "sluice",
    about = "A test and debug tool for BMC AHB interfaces",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// Get verbose output
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Don't produce any output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Skip BRIDGE during implicit negotiation (repeatable)
    #[arg(short, long, global = true, value_name = "BRIDGE")]
    skip_bridge: Vec<String>,

    /// List available bridge drivers
    #[arg(short, long)]
    list_bridges: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read data out of the BMC
    Read(cmd::read::Cmd),
    /// Write data into the BMC
    Write(cmd::write::Cmd),
    /// Scalar accesses through the local /dev/mem mapping
    Devmem(cmd::devmem::Cmd),
    /// Assess the bridge surfaces the BMC exposes
    Probe(cmd::probe::Cmd),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let mut registry = BridgeRegistry::builtin();
    for name in &cli.skip_bridge {
        if let Err(error) = registry.disable(name) {
            eprintln!("Error: {error} (use '-l' to list)");
            return ExitCode::FAILURE;
        }
    }

    if cli.list_bridges {
        return list_bridges(&registry);
    }

    let Some(command) = cli.command else {
        eprintln!("Error: no command given (try '--help')");
        return ExitCode::FAILURE;
    };

    let result = match command {
        Command::Read(cmd) => cmd::read::run(cmd, &registry),
        Command::Write(cmd) => cmd::write::run(cmd, &registry),
        Command::Devmem(cmd) => cmd::devmem::run(cmd, &registry),
        Command::Probe(cmd) => cmd::probe::run(cmd, &registry),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            report(&error);
            ExitCode::FAILURE
        }
    }
}

fn list_bridges(registry: &BridgeRegistry) -> ExitCode {
    for row in registry.list() {
        println!(
            "{:<8} {:>3}  {}{}",
            row.name,
            row.priority,
            row.description,
            if row.enabled { "" } else { " (disabled)" },
        );
    }

    ExitCode::SUCCESS
}

fn report(error: &anyhow::Error) {
    eprintln!("Error: {error:#}");

    let needs_privilege = error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sluice::Error>(),
            Some(sluice::Error::NoBridgeAvailable(e)) if e.insufficient_privilege()
        ) || cause
            .downcast_ref::<sluice::NoBridgeAvailable>()
            .is_some_and(|e| e.insufficient_privilege())
    });

    if needs_privilege {
        eprintln!("A bridge transport was found but could not be opened; try again as root.");
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = if quiet {
        "off"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // stdout carries dumped data; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
