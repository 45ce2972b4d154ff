//! Entrypoint of the hyperschedule binary

use dotenvy::dotenv;
use hyperschedule_clap_blocks::tokio::TokioIoConfig;

mod commands {
    pub(crate) mod serve;
}

enum ReturnCode {
    Failure = 1,
}

#[derive(Debug, clap::Parser)]
#[clap(
    name = "hyperschedule",
    version,
    disable_help_flag = true,
    arg(
        clap::Arg::new("help")
            .short('h')
            .long("help")
            .help("Print help information")
            .action(clap::ArgAction::Help)
            .global(true)
    ),
    about = "Hyperschedule course data server",
    long_about = r#"Hyperschedule course data server

Examples:
    # Run the server, scraping the course portal every five seconds
    hyperschedule serve --portal-username me --portal-password hunter2

    # Run the server on cached data only, without scraping
    hyperschedule serve --no-scrape --cache-dir out

    # Run in production mode: no debug routes, no cache by default
    hyperschedule serve --production --snitch-url https://nosnch.in/abc123

    # Run with full debug logging specified with LOG_FILTER
    LOG_FILTER=debug hyperschedule serve
"#
)]
struct Config {
    #[clap(flatten)]
    runtime_config: TokioIoConfig,

    #[clap(subcommand)]
    command: Option<Command>,
}

// Ignoring clippy here since this enum is just used for running
// the CLI command
#[allow(clippy::large_enum_variant)]
#[derive(Debug, clap::Parser)]
enum Command {
    /// Run the hyperschedule server
    Serve(commands::serve::Config),
}

fn main() -> Result<(), std::io::Error> {
    // load all environment variables from .env before doing anything
    load_dotenv();

    let config: Config = clap::Parser::parse();

    let tokio_runtime = config.runtime_config.builder()?.build()?;

    tokio_runtime.block_on(async move {
        match config.command {
            None => println!("command required, -h/--help for help"),
            Some(Command::Serve(config)) => {
                if let Err(e) = config.logging_config.install_global_subscriber() {
                    eprintln!("Initializing logs failed: {e}");
                    std::process::exit(ReturnCode::Failure as _);
                }
                if let Err(e) = commands::serve::command(config).await {
                    eprintln!("Serve command failed: {e:#}");
                    std::process::exit(ReturnCode::Failure as _)
                }
            }
        }
    });

    Ok(())
}

/// Source the .env file before initialising the Config struct, so the envs it sets are seen by
/// clap.
///
/// Precedence is given to existing env variables.
fn load_dotenv() {
    match dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            // a missing .env file is fine, clap applies its defaults
        }
        Err(e) => {
            eprintln!("FATAL Error loading config from: {e}");
            eprintln!("Aborting");
            std::process::exit(ReturnCode::Failure as _);
        }
    };
}
