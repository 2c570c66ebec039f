use std::{io::Write, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{HttpUserService, ServiceVariant, UserManager};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::Flow;
use config::load_settings;

#[derive(Parser, Debug)]
#[command(
    name = "user-console",
    about = "List, add, edit and delete users of a remote user service"
)]
struct Args {
    #[arg(long, env = "BACKEND_URL", help = "User service origin")]
    backend_url: Option<String>,

    #[arg(long, value_name = "plain|session", help = "Service flavour")]
    variant: Option<ServiceVariant>,

    #[arg(long, default_value = "console.toml", help = "Config file path")]
    config: PathBuf,

    #[arg(long, help = "Per-request timeout in seconds")]
    timeout_secs: Option<u64>,

    #[arg(long, help = "Log filter, e.g. debug or client_core=debug")]
    log: Option<String>,

    #[arg(long, help = "Print the user list and exit")]
    once: bool,
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    Ok(())
}

async fn run_shell(manager: &UserManager) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("! {err:#}");
                continue;
            }
        };

        match commands::execute(manager, command).await {
            Ok(Flow::Quit) => break,
            Ok(Flow::Quiet) => continue,
            Ok(Flow::Render) => {}
            Err(err) => println!("! {err:#}"),
        }
        println!("{}", manager.view().await);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log.as_deref());

    let mut settings = load_settings(&args.config);
    if let Some(url) = args.backend_url {
        settings.backend_url = Some(url);
    }
    if let Some(variant) = args.variant {
        settings.variant = variant;
    }
    if let Some(secs) = args.timeout_secs {
        settings.request_timeout_secs = Some(secs);
    }

    let base_url = settings.backend_url()?;
    info!(%base_url, variant = %settings.variant, "starting user console");

    let service = HttpUserService::builder(base_url, settings.variant)
        .timeout(settings.request_timeout())
        .build()
        .context("failed to set up user service client")?;
    let manager = UserManager::new(Arc::new(service));

    let initial_load = manager.load_users().await;
    if let Err(err) = &initial_load {
        warn!(error = %err, "initial user list load failed");
    }
    println!("{}", manager.view().await);

    if args.once {
        return initial_load.context("failed to load users");
    }

    println!("type 'help' for commands");
    run_shell(&manager).await
}
