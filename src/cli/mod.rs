//! Command-line interface.
//!
//! Without a subcommand the binary starts the storefront server. The other
//! subcommands work directly against the local configuration and database:
//! - `user add` - Create a user who can sign in
//! - `config check` - Validate configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::auth::hash_password;
use crate::config::Config;
use crate::db::{self, users, NewUser};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, long_about = None)]
#[command(about = "A minimal storefront backed by a Stripe product catalog")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "storefront.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the storefront server (default)
    Serve,

    /// User management commands
    #[command(subcommand)]
    User(UserCommands),

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create a user who can sign in with email and password
    Add {
        /// Email address, used as the sign-in username
        #[arg(long)]
        email: String,
        /// Display name
        #[arg(long, default_value = "")]
        name: String,
        /// Role claim carried in the user's session
        #[arg(long, default_value = "user")]
        role: String,
        /// Password (prefer the environment variable over the command line)
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

impl Cli {
    /// Whether this invocation starts the server
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Commands::Serve))
    }
}

/// Run a non-server CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Some(Commands::User(UserCommands::Add {
            email,
            name,
            role,
            password,
        })) => cmd_user_add(config, email, name, role, password).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli, config),
        Some(Commands::Serve) | None => {
            // Starting the server is handled in main.rs
            Ok(())
        }
    }
}

async fn cmd_user_add(
    config: &Config,
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<()> {
    if email.is_empty() {
        anyhow::bail!("Email is required");
    }
    if password.is_empty() {
        anyhow::bail!("Password is required (--password or STOREFRONT_PASSWORD)");
    }

    let pool = db::init(&config.database).await?;
    let user = create_user(&pool, email, name, role, password).await?;
    pool.close().await;

    println!("[OK] Created user {} ({}) with role '{}'", user.email, user.id, user.role);
    Ok(())
}

/// Hash the password and insert the user.
pub async fn create_user(
    pool: &db::DbPool,
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<db::User> {
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    let user = users::create(
        pool,
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: role.to_string(),
        },
    )
    .await
    .with_context(|| format!("Failed to create user {}", email))?;

    tracing::info!(user_id = %user.id, role = %user.role, "Created user");
    Ok(user)
}

fn cmd_config_check(cli: &Cli, config: &Config) -> Result<()> {
    println!("Checking configuration file: {}", cli.config.display());
    println!();

    if !cli.config.exists() {
        println!("[!!] Configuration file not found; defaults and environment are in use.");
        println!(
            "To create a custom configuration, copy storefront.example.toml to storefront.toml"
        );
        println!();
    }

    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:      {}:{}", config.server.host, config.server.port);
    println!("  Static Dir:   {}", config.server.static_dir.display());
    println!();
    println!("Database:");
    println!("  URL:          {}", config.database.url);
    println!();
    println!("Catalog:");
    println!("  API Base:     {}", config.catalog.api_base);
    println!("  API Version:  {}", config.catalog.api_version);
    println!(
        "  Secret Key:   {}",
        if config.catalog.secret_key.is_empty() { "(not set)" } else { "(set)" }
    );
    println!();
    println!("Sessions:");
    println!("  Max Age:      {}s", config.auth.session_max_age_secs);
    println!("  Cookie:       {}", config.auth.cookie_name);
    println!();

    let errors = config.validate();
    if errors.is_empty() {
        println!("[OK] Configuration is valid");
        Ok(())
    } else {
        for error in &errors {
            println!("[!!] {}", error);
        }
        anyhow::bail!("Configuration has {} error(s)", errors.len())
    }
}
