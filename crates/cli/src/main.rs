//! Fashion Hub CLI - Database migrations and main admin management.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! fh-cli migrate
//!
//! # Create (or promote) the main admin; password from MAIN_ADMIN_PASSWORD
//! fh-cli admin bootstrap -i owner@fashionhub.in -n "Store Owner"
//!
//! # List admin accounts and their approval state
//! fh-cli admin list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin bootstrap` - Create the main admin
//! - `admin list` - List admin accounts

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fh-cli")]
#[command(author, version, about = "Fashion Hub CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create the main admin, or promote an existing account to it
    Bootstrap {
        /// Login identifier (email or username)
        #[arg(short, long)]
        identifier: String,

        /// Display name
        #[arg(short, long, default_value = "Main Admin")]
        name: String,
    },
    /// List every admin account with its role
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Admin { action } => match action {
            AdminAction::Bootstrap { identifier, name } => {
                commands::admin::bootstrap(&identifier, &name).await?;
            }
            AdminAction::List => commands::admin::list().await?,
        },
    }
    Ok(())
}
