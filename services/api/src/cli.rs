use crate::commands::{run_normalize, run_submit, NormalizeArgs, SubmitArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use listing_wizard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Listing Wizard",
    about = "Serve the property listing wizard or run its pipeline from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the normalized payload and corrections for a draft file
    Normalize(NormalizeArgs),
    /// Normalize a draft, encode its photos, and submit it to the configured backend
    Submit(SubmitArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Normalize(args) => run_normalize(args),
        Command::Submit(args) => run_submit(args).await,
    }
}
