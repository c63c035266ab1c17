//! starcom - command-line client for StarExec
//!
//! Starts the interactive shell, or runs a file of shell commands, against a
//! StarExec instance.

use std::io;
use std::process;

use tracing::{debug, info};
use url::Url;

use starcom::app::Status;
use starcom::auth::resolve_credentials;
use starcom::cli::{Cli, Commands, Connector, Shell, ShellOptions};
use starcom::config::AppConfig;
use starcom::errors::{ConfigError, Result};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(status) if status.is_error() => process::exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<Status> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    init_logging(&cli, config.log_level());

    info!("starcom v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = &cli.global.addr {
        config.service.base_url = addr.clone();
    }
    if cli.global.insecure {
        config.client.accept_invalid_certs = true;
    }
    let base_url: Url = config.base_url()?;
    debug!("Using StarExec at {}", base_url);

    let options = ShellOptions {
        prompt: config.shell.prompt.clone(),
        base_url,
        progress: !cli.global.quiet,
    };
    let connector = Connector::Http(config.to_client_config());
    let mut shell = Shell::new(options, connector, io::stdout());

    if cli.global.login {
        let credentials = resolve_credentials()?;
        let outcome = shell.login_with(credentials, None).await;
        shell.print(&outcome);
        if outcome.is_error() {
            return Ok(outcome.status);
        }
    }

    let status = match cli.command() {
        Commands::Shell => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell.run(stdin).await?
        }
        Commands::Run(args) => {
            if !args.file.is_file() {
                return Err(ConfigError::NotFound { path: args.file }.into());
            }
            let status = shell.run_file(&args.file, args.echo).await;
            shell.exit().await;
            status
        }
    };

    info!("starcom finished: {}", status.message());
    Ok(status)
}

/// Initialize logging based on CLI flags and the configured level
fn init_logging(cli: &Cli, configured: tracing::Level) {
    let level = cli.log_level(configured);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = format!("starcom={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .init();
}
