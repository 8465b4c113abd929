use crate::demo::{run_demo, run_inbox, run_report, DemoArgs, InboxArgs, ReportArgs};
use crate::server;
use becas::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "Scholarship Portal",
    about = "Run and operate the scholarship portal from the command line",
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
    /// Walk through intake, evaluation and notifications on an in-memory store
    Demo(DemoArgs),
    /// Print the administrator dashboard or the CSV export
    Report(ReportArgs),
    /// Show an account's notification mailbox
    Inbox(InboxArgs),
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
        Command::Demo(args) => run_demo(args),
        Command::Report(args) => run_report(args).await,
        Command::Inbox(args) => run_inbox(args).await,
    }
}
