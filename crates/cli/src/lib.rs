pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use helpline_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "helpline",
    about = "Helpline operator CLI",
    long_about = "Prepare the helpline database and check runtime readiness before starting the bot.",
    after_help = "Examples:\n  helpline migrate\n  helpline migrate --status\n  helpline doctor --json"
)]
pub struct Cli {
    /// Config file to load instead of `helpline.toml` / `config/helpline.toml`.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate {
        #[arg(long, help = "Only list pending migrations, do not apply them")]
        status: bool,
    },
    #[command(about = "Validate config, database connectivity, and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match cli.command {
        Command::Migrate { status } => commands::migrate::run(options, status),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
