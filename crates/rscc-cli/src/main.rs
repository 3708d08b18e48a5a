//! rscc CLI
//!
//! Single binary for remote support sessions:
//! - Share this desktop under a session key (request)
//! - View a desktop shared under a key (join)
//! - Call a supporter directly, or wait for calls (call, listen)
//! - Key, address book and configuration utilities

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rscc::commands::{self, CallTarget};
use rscc::output::{format_state, print_error};
use rscc::runtime::{build_orchestrator, load_app_config, shutdown_token, supporter_store};
use rscc_core::config::Supporter;
use rscc_core::SessionKey;

#[derive(Parser)]
#[command(name = "rscc")]
#[command(author, version, about = "Remote support connection client")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Share this desktop: request a key and wait for a viewer
    Request,

    /// View the desktop shared under a key
    Join {
        /// Session key, with or without spaces (e.g. "123 456 789")
        key: String,
    },

    /// Call a listening supporter directly (reverse VNC connection)
    Call {
        /// Supporter address (host or IP)
        #[arg(required_unless_present = "supporter", conflicts_with = "supporter")]
        address: Option<String>,
        /// Port the supporter listens on (defaults to the direct-call port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Encrypt the connection
        #[arg(short, long)]
        encrypted: bool,
        /// Call an address-book entry by description
        #[arg(short, long)]
        supporter: Option<String>,
    },

    /// Run the VNC viewer as a listening service until interrupted
    Listen,

    /// Session key utilities
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Manage the supporter address book
    Supporters {
        #[command(subcommand)]
        action: SupportersAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Print a key in display form
    Format { key: String },
    /// Check that a key is complete
    Validate { key: String },
}

#[derive(Subcommand)]
enum SupportersAction {
    /// List address-book entries
    List,
    /// Add or replace an entry
    Add {
        /// Display name
        description: String,
        /// Host or IP
        address: String,
        /// Port the supporter listens on
        #[arg(short, long, default_value = "")]
        port: String,
        /// Encrypt the connection
        #[arg(short, long)]
        encrypted: bool,
        /// Support from this entry is billed
        #[arg(long)]
        chargeable: bool,
    },
    /// Remove an entry
    Remove { description: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config_path = cli.config.as_ref();

    match cli.command {
        Commands::Request => {
            let orchestrator = build_orchestrator(load_app_config(config_path)?)?;
            commands::request_command(orchestrator.clone(), shutdown_token()).await?;
            tracing::debug!("Final state:\n{}", format_state(&orchestrator.state()));
        }

        Commands::Join { key } => {
            // Validate before anything contacts the key server
            let key = match SessionKey::parse(&key) {
                Ok(key) => key,
                Err(e) => {
                    print_error(&format!("Invalid key: {}", e));
                    return Err(e.into());
                }
            };
            let orchestrator = build_orchestrator(load_app_config(config_path)?)?;
            commands::join_command(orchestrator.clone(), key, shutdown_token()).await?;
            tracing::debug!("Final state:\n{}", format_state(&orchestrator.state()));
        }

        Commands::Call {
            address,
            port,
            encrypted,
            supporter,
        } => {
            let target = match (supporter, address) {
                (Some(name), _) => CallTarget::Supporter(find_supporter(config_path, &name)?),
                (None, Some(address)) => CallTarget::Address {
                    address,
                    port,
                    encrypted,
                },
                (None, None) => anyhow::bail!("Either an address or --supporter is required"),
            };
            let orchestrator = build_orchestrator(load_app_config(config_path)?)?;
            commands::call_command(orchestrator, target, shutdown_token()).await?;
        }

        Commands::Listen => {
            let orchestrator = build_orchestrator(load_app_config(config_path)?)?;
            commands::listen_command(orchestrator, shutdown_token()).await?;
        }

        Commands::Key { action } => match action {
            KeyAction::Format { key } => commands::key_format(&key)?,
            KeyAction::Validate { key } => commands::key_validate(&key)?,
        },

        Commands::Supporters { action } => match action {
            SupportersAction::List => commands::supporters_list(config_path)?,
            SupportersAction::Add {
                description,
                address,
                port,
                encrypted,
                chargeable,
            } => commands::supporters_add(
                config_path,
                Supporter {
                    description,
                    address,
                    port,
                    encrypted,
                    chargeable,
                },
            )?,
            SupportersAction::Remove { description } => {
                commands::supporters_remove(config_path, &description)?
            }
        },

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(config_path)?,
            ConfigAction::Path => commands::config_path(config_path)?,
            ConfigAction::Init { force } => commands::config_init(config_path, force)?,
        },
    }

    Ok(())
}

/// Look up an address-book entry by description
fn find_supporter(config_path: Option<&PathBuf>, name: &str) -> Result<Supporter> {
    let store = supporter_store(config_path);
    match store
        .load()
        .into_iter()
        .find(|s| s.description.eq_ignore_ascii_case(name))
    {
        Some(supporter) => Ok(supporter),
        None => {
            print_error(&format!("No supporter named '{}'", name));
            anyhow::bail!("Supporter not found: {}", name)
        }
    }
}
