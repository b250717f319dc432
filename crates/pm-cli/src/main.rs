use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pm_cli::commands::{dfg, import, queue_map, status, summary, variants};
use pm_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(pm_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = pm_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();
    match command {
        Commands::Import(args) => {
            let outcome = import::run(&mut stdout, &mut db, args)?;
            tracing::debug!(?outcome, "import finished");
        }
        Commands::Status => status::run(&mut stdout, &db, &config)?,
        Commands::Dfg(args) => dfg::run(&mut stdout, &mut db, &config, args)?,
        Commands::QueueMap(args) => queue_map::run(&mut stdout, &db, &config, args)?,
        Commands::Variants(args) => variants::run(&mut stdout, &mut db, &config, args)?,
        Commands::Summary(args) => summary::run(&mut stdout, &mut db, &config, args)?,
    }

    Ok(())
}
