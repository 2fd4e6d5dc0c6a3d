//! Load a JSON snapshot (as written by the file backing store) into the
//! configured database.

use std::path::PathBuf;
use std::sync::Arc;

use alert_config::{
    alerts::{BackingStore, ConfigurationStore, FileBackingStore},
    config::ConfigLoader,
    db,
    repositories::AlertConfigurationRepository,
};
use anyhow::{Context, Result, bail};
use clap::Parser;

#[derive(Parser)]
#[command(name = "import_snapshot")]
#[command(about = "Import saved alert configurations from a JSON snapshot into the database")]
struct Cli {
    /// Snapshot file to read
    #[arg(long)]
    from: PathBuf,

    /// Replace existing rows even when the database already holds records
    #[arg(long)]
    force: bool,

    /// Validate and report without writing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ConfigLoader::new().load().context("loading configuration")?;

    if !cli.from.exists() {
        bail!("snapshot file {} does not exist", cli.from.display());
    }

    // Hydrating through the store applies the same version and key checks as startup.
    let source = ConfigurationStore::hydrate(Arc::new(FileBackingStore::new(&cli.from)))
        .await
        .with_context(|| format!("reading snapshot {}", cli.from.display()))?;
    let snapshot = source.snapshot();
    println!(
        "Read {} configuration records from {}",
        snapshot.len(),
        cli.from.display()
    );

    if cli.dry_run {
        println!("Dry run; database untouched");
        return Ok(());
    }

    let conn = db::init_and_migrate(&config)
        .await
        .context("initializing database")?;
    let repository = AlertConfigurationRepository::new(Arc::new(conn));

    let existing = repository.count().await?;
    if existing > 0 && !cli.force {
        bail!("database already holds {existing} records; rerun with --force to replace them");
    }

    repository
        .persist(&snapshot)
        .await
        .context("writing snapshot to database")?;
    println!("Imported {} records", snapshot.len());

    Ok(())
}
