mod builder;
mod config;
mod listing;
mod render;
mod storage;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;
use tracing::info;
use tracing_subscriber::EnvFilter;

use builder::StoreBuilders;
use listing::{list_containers, ContainerRecord};
use render::{print_json, print_table, TableOptions};
use storage::DiskStore;

// ======================================================
// CLI
// ======================================================

#[derive(Parser)]
#[command(name = "brick")]
#[command(about = "Build container images from working containers")]
struct Cli {
    /// Storage root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Storage driver that laid out the root (overlay, vfs, ...)
    #[arg(long, global = true)]
    storage_driver: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List working containers and their base images.
    ///
    /// Lists containers which appear to be brick working containers, their
    /// names and IDs, and the names and IDs of the images from which they
    /// were initialized.
    Containers(ContainersArgs),
    Version,
}

#[derive(clap::Args, Debug)]
struct ContainersArgs {
    /// Also list non-brick containers
    #[arg(short, long)]
    all: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Do not print column headings
    #[arg(short, long)]
    noheading: bool,

    /// Do not truncate output
    #[arg(long)]
    notruncate: bool,

    /// Display only container IDs
    #[arg(short, long)]
    quiet: bool,
}

// ======================================================
// MAIN
// ======================================================

fn main() {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Containers(ref args) => {
            if let Err(e) = containers(&cli, args) {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit(1);
            }
        }

        Commands::Version => {
            println!("brick {}", env!("CARGO_PKG_VERSION"));
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("BRICK_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

// ======================================================
// CONTAINERS
// ======================================================

fn containers(cli: &Cli, args: &ContainersArgs) -> Result<()> {
    let path = config::config_path();
    let file = config::load_config(&path)?;
    let location = config::resolve_location(
        cli.root.clone(),
        cli.storage_driver.clone(),
        |key| std::env::var(key).ok(),
        &file,
    );

    info!(root = %location.root.display(), driver = %location.driver, "opening storage");

    let store = DiskStore::open(location.root, location.driver);
    let builders = StoreBuilders::new(&store);

    let records = list_containers(&builders, &store, args.all)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    write_records(&mut out, &records, args)?;
    out.flush().context("flushing output")?;
    Ok(())
}

/// `--json` takes precedence over every table flag.
fn write_records<W: Write>(out: &mut W, records: &[ContainerRecord], args: &ContainersArgs) -> Result<()> {
    if args.json {
        print_json(out, records).context("writing JSON output")?;
    } else {
        let opts = TableOptions {
            quiet: args.quiet,
            noheading: args.noheading,
            notruncate: args.notruncate,
        };
        print_table(out, records, &opts).context("writing container table")?;
    }
    Ok(())
}
