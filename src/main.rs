use clap::Parser;
use tracing_subscriber::EnvFilter;

use pmx::cli::{Cli, Command};
use pmx::commands;
use pmx::config::{self, Connection};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // Info-level messages double as user-facing output (state requested,
    // deletion requested, ...); --debug widens, --quiet silences.
    let filter = if cli.debug {
        EnvFilter::new("pmx=debug")
    } else if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::from_default_env()
            .add_directive("pmx=info".parse().expect("valid log directive"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let file = config::load_config(cli.config.as_deref())?;
    let conn = Connection::resolve(&cli.connect, &file)?;

    dispatch(cli, &conn).await.map_err(Into::into)
}

async fn dispatch(cli: Cli, conn: &Connection) -> Result<(), pmx::error::PmxError> {
    let quiet = cli.quiet;
    match cli.command {
        Command::Version => commands::version::run(conn).await,
        Command::List { kind } => commands::list::run(conn, kind).await,
        Command::Start { vmid, wait } => commands::start::run(conn, vmid, &wait, quiet).await,
        Command::Stop {
            vmid,
            idempotent,
            wait,
        } => commands::stop::run(conn, vmid, idempotent, &wait, quiet).await,
        Command::Pause { vmid, wait } => commands::pause::run(conn, vmid, &wait, quiet).await,
        Command::Clone(args) => commands::clone::run(conn, &args, quiet).await,
        Command::Destroy {
            vmid,
            force,
            idempotent,
            wait,
        } => commands::destroy::run(conn, vmid, force, idempotent, &wait, quiet).await,
        Command::Set {
            vmid,
            options,
            wait,
        } => commands::set::run(conn, vmid, &options, &wait, quiet).await,
        Command::Config { vmid } => commands::config::run(conn, vmid).await,
        Command::Status { upid, wait } => commands::status::run(conn, &upid, &wait, quiet).await,
    }
}
