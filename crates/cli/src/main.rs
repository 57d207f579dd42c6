//! valstack CLI
//!
//! Builds a value stack from command-line literals and prints what the
//! buffer accessor and the context dumper report for it.

use clap::{Parser as ClapParser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use valstack_cli::{CliConfig, build_stack, buffer_lines};

#[derive(ClapParser)]
#[command(name = "valstack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect value stacks: buffer access and context dumps", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Label printed before the stack handle in dumps
    #[arg(long, global = true)]
    label: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the buffer view at every index
    Buffers {
        /// Value literals, bottom first (defaults to the canonical fixture)
        #[arg(allow_negative_numbers = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Print the one-line context dump
    Dump {
        /// Value literals, bottom first (defaults to the canonical fixture)
        #[arg(allow_negative_numbers = true, allow_hyphen_values = true)]
        values: Vec<String>,

        /// Emit a per-slot JSON report instead
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("VALSTACK_LOG")
                .unwrap_or_else(|_| EnvFilter::new("valstack=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(label) = cli.label {
        config.dump.label = label;
    }

    match cli.command {
        Commands::Buffers { values } => {
            let stack = build_stack(&values, config.stack)?;
            debug!(stack = %stack.id(), top = stack.top(), "built stack");
            for line in buffer_lines(&stack)? {
                println!("{}", line);
            }
        }
        Commands::Dump { values, json } => {
            let stack = build_stack(&values, config.stack)?;
            debug!(stack = %stack.id(), top = stack.top(), "built stack");
            if json {
                println!("{}", stack.report_with(&config.dump.jsonx).to_json_pretty());
            } else {
                println!("{}", stack.dump_context_with(&config.dump));
            }
        }
    }
    Ok(())
}
