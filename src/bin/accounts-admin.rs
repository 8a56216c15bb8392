//! Account Administration CLI
//!
//! Maintenance tasks that run directly against the PostgreSQL store: seeding
//! and extending the interest catalogue, looking up users and purging stale
//! reset codes.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;

use bytechs_accounts::{
    config::{AppConfig, StoreBackend},
    database::{run_migrations, DatabaseConfig},
    service::{EmailService, InterestService, JwtService, PasswordResetService},
    store::{InterestStore, PgStore, UserStore},
    utils::validation::normalize_email,
    DEFAULT_INTERESTS,
};

/// ByTechs account administration CLI
#[derive(Parser)]
#[command(name = "accounts-admin", about = "ByTechs account administration CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the default interests that are missing
    SeedInterests,
    /// Add one interest to the catalogue
    AddInterest(AddInterestArgs),
    /// List the interest catalogue
    ListInterests,
    /// Show a user and their interests
    FindUser(FindUserArgs),
    /// Delete reset codes whose entry window has closed and unused grants
    PurgeResetCodes,
}

#[derive(Args)]
struct AddInterestArgs {
    /// Interest name as shown on the selection screen
    name: String,
}

#[derive(Args)]
struct FindUserArgs {
    /// Email address of the account
    email: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    if config.store.backend != StoreBackend::Postgres {
        bail!("accounts-admin only works with STORE_BACKEND=postgres");
    }
    let db_config = DatabaseConfig::from_store_config(&config.store)
        .context("DATABASE_URL is required")?;
    let pool = db_config.create_pool().await?;
    run_migrations(&pool).await?;

    let store = Arc::new(PgStore::new(pool));

    match cli.command {
        Commands::SeedInterests => seed_interests(store).await?,
        Commands::AddInterest(args) => add_interest(store, args).await?,
        Commands::ListInterests => list_interests(store).await?,
        Commands::FindUser(args) => find_user(store, args).await?,
        Commands::PurgeResetCodes => purge_reset_codes(store, config).await?,
    }

    Ok(())
}

async fn seed_interests(store: Arc<PgStore>) -> anyhow::Result<()> {
    let added = InterestService::new(store)
        .seed_defaults(DEFAULT_INTERESTS)
        .await?;

    if added.is_empty() {
        println!("All default interests are already present.");
    } else {
        println!("Added {} interests:", added.len());
        for interest in added {
            println!("  {}  {}", interest.id, interest.name);
        }
    }
    Ok(())
}

async fn add_interest(store: Arc<PgStore>, args: AddInterestArgs) -> anyhow::Result<()> {
    let interest = InterestService::new(store)
        .create_interest(&args.name)
        .await?;
    println!("Added interest {} ({})", interest.name, interest.id);
    Ok(())
}

async fn list_interests(store: Arc<PgStore>) -> anyhow::Result<()> {
    let interests = store.list_interests().await?;
    if interests.is_empty() {
        println!("No interests found. Run 'accounts-admin seed-interests' first.");
        return Ok(());
    }

    println!("{:<38} {}", "ID", "Name");
    println!("{}", "-".repeat(70));
    for interest in interests {
        println!("{:<38} {}", interest.id, interest.name);
    }
    Ok(())
}

async fn find_user(store: Arc<PgStore>, args: FindUserArgs) -> anyhow::Result<()> {
    let email = normalize_email(&args.email);
    let Some(user) = store.find_user_by_email(&email).await? else {
        println!("No user found with email {}", email);
        return Ok(());
    };
    let interests = store.user_interests(user.id).await?;

    println!("ID:        {}", user.id);
    println!("Name:      {}", user.full_name);
    println!("Email:     {}", user.email);
    println!("Phone:     {}", user.phone);
    println!("Verified:  {}", if user.email_verified { "yes" } else { "no" });
    println!("Created:   {}", user.created_at.format("%Y-%m-%d %H:%M"));
    println!(
        "Interests: {}",
        interests
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(())
}

async fn purge_reset_codes(store: Arc<PgStore>, config: AppConfig) -> anyhow::Result<()> {
    let jwt = Arc::new(JwtService::with_lifetimes(
        store.clone(),
        config.jwt.access_secret.clone(),
        config.jwt.refresh_secret.clone(),
        config.jwt.lifetimes(),
    ));
    let email = Arc::new(EmailService::from_config(config.email)?);
    let resets = PasswordResetService::new(store, jwt, email, config.policy);

    let codes = resets.purge_expired_codes().await?;
    let grants = resets.purge_expired_grants().await?;
    println!("Purged {} expired reset codes and {} expired grants.", codes, grants);
    Ok(())
}
