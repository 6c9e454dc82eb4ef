use clap::Parser;
use tracing_subscriber::EnvFilter;

use idmef_db::cli::Args;
use idmef_db::db::{open_db, DatabaseConfig};

/// Log to stderr, filtered by IDMEF_DB_LOG (default "warn").
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("IDMEF_DB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = Args::parse();
    let config = match &args.db {
        Some(url) => DatabaseConfig::from_url(url)?,
        None => DatabaseConfig::resolve()?,
    };
    let db = open_db(config)?;
    let output = args.command.run(&db, args.format)?;
    println!("{}", output);
    db.disconnect()?;
    Ok(())
}
