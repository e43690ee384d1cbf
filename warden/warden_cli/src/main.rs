use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

use commands::check::CheckArgs;
use commands::permissions::PermissionsArgs;
use commands::validate::ValidateArgs;

/// Warden Command Line Interface
///
/// Loads a policy document and answers permission requests against it.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Log decisions and context reads to stderr
    #[clap(long, short, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide one permission request; exits 0 when allowed and 1 when denied
    Check(CheckArgs),

    /// List the permissions a requester holds in a context
    Permissions(PermissionsArgs),

    /// Parse and load a policy document, listing its contexts
    Validate(ValidateArgs),
}

/// Exit status for failures that prevented a decision
const EXIT_ERROR: u8 = 2;

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("warden_policy=trace,warden_cli=debug")
    } else {
        EnvFilter::try_from_env("WARDEN_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Check(args) => commands::check::execute(args)
            .map(|allowed| if allowed { ExitCode::SUCCESS } else { ExitCode::from(1) }),
        Commands::Permissions(args) => commands::permissions::execute(args).map(|_| ExitCode::SUCCESS),
        Commands::Validate(args) => commands::validate::execute(args).map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
