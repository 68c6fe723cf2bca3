//! Neighbourly CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations and create the session table
//! nb-cli migrate
//!
//! # Create 100 demo help requests across the UK
//! nb-cli seed demo
//!
//! # Create a specific number of demo requests
//! nb-cli seed demo --count 25
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed demo` - Populate the database with sample requests

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nb-cli")]
#[command(author, version, about = "Neighbourly CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with sample data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Create demo help requests owned by the demo account
    Demo {
        /// Number of requests to create
        #[arg(short, long, default_value_t = 100)]
        count: usize,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Demo { count } => commands::seed::demo(count).await?,
        },
    }
    Ok(())
}
