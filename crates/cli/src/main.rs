//! Ébano CLI - Database migrations and maintenance tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ebano-cli migrate
//!
//! # Create an admin account (password from EBANO_ADMIN_PASSWORD)
//! ebano-cli admin create -e admin@example.com -n "Admin Name"
//!
//! # Check a user's password
//! ebano-cli user check-password -e customer@example.com
//!
//! # Copy all data into another database
//! ebano-cli data copy --from postgres://old/ebano --to postgres://new/ebano
//!
//! # Delete all data
//! ebano-cli data purge --yes
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `admin create` - Create admin accounts
//! - `user check-password` - Verify a stored password
//! - `data copy` / `data purge` - Bulk data maintenance

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "ebano-cli")]
#[command(author, version, about = "Ébano CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Bulk data maintenance
    Data {
        #[command(subcommand)]
        action: DataAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Postal address
        #[arg(long)]
        address: Option<String>,

        /// Password (prefer the environment variable)
        #[arg(long, env = "EBANO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Check a password against the stored hash
    CheckPassword {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Password to check (prefer the environment variable)
        #[arg(long, env = "EBANO_CHECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum DataAction {
    /// Copy every row into another database with the same schema
    Copy {
        /// Source database URL
        #[arg(long, env = "EBANO_COPY_FROM", hide_env_values = true)]
        from: String,

        /// Target database URL
        #[arg(long, env = "EBANO_COPY_TO", hide_env_values = true)]
        to: String,
    },
    /// Delete every row from the configured database
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                phone,
                address,
                password,
            } => {
                let id = commands::admin::create_user(commands::admin::NewAdmin {
                    email: email.clone(),
                    name,
                    phone,
                    address,
                    password: SecretString::from(password),
                })
                .await?;
                tracing::info!("Created admin {email} (ID {id})");
            }
        },
        Commands::User { action } => match action {
            UserAction::CheckPassword { email, password } => {
                let check =
                    commands::user::check_password(&email, &SecretString::from(password)).await?;
                if !check.active {
                    tracing::warn!("Account {email} is disabled");
                }
                if check.matches {
                    tracing::info!("Password matches for {email}");
                } else {
                    return Err(format!("Password does not match for {email}").into());
                }
            }
        },
        Commands::Data { action } => match action {
            DataAction::Copy { from, to } => {
                let counts =
                    commands::data::copy(SecretString::from(from), SecretString::from(to))
                        .await?;
                let inserted: u64 = counts.iter().map(|c| c.inserted).sum();
                tracing::info!("Copy complete: {inserted} rows inserted");
            }
            DataAction::Purge { yes } => {
                let counts = commands::data::purge(yes).await?;
                let deleted: u64 = counts.iter().map(|(_, n)| n).sum();
                tracing::info!("Purge complete: {deleted} rows deleted");
            }
        },
    }
    Ok(())
}
