//! Hubmirror CLI - runs the GitHub mirror server and its maintenance commands.

mod api;
mod commands;
mod config;
mod shutdown;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hubmirror")]
#[command(version)]
#[command(about = "Mirror GitHub users, repositories and commits into a local database")]
#[command(after_long_help = r#"EXAMPLES
    Run the API server and background sync:
        $ hubmirror serve

    Backfill one user in the foreground, without pauses between repositories:
        $ hubmirror discover octocat --no-pacing

CONFIGURATION
    Hubmirror reads configuration from:
      1. ~/.config/hubmirror/config.toml or ./hubmirror.toml
      2. Environment variables (HUBMIRROR_ prefix, e.g. HUBMIRROR_GITHUB__TOKEN)
      3. .env file in current directory

ENVIRONMENT VARIABLES
    HUBMIRROR_DATABASE__URL   Database connection string (default: ~/.local/state/hubmirror/hubmirror.db)
    HUBMIRROR_GITHUB__TOKEN   GitHub personal access token
    DATABASE_URL, GITHUB_TOKEN, COMMIT_START_DATE, COMMIT_END_DATE
                              Accepted when the settings above are unset
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and run background discovery
    Serve {
        /// Address to listen on (default from config or 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Register a user and backfill their repositories now
    Discover {
        /// GitHub username
        username: String,

        /// Display name stored with the user
        #[arg(long)]
        display_name: Option<String>,

        /// Skip the pause between repositories
        #[arg(long)]
        no_pacing: bool,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("hubmirror=info,hubmirror_cli=info,tower_http=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let config = config::Config::load();
    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set HUBMIRROR_DATABASE__URL")?;

    // Ensure the database directory exists for SQLite
    if database_url.starts_with("sqlite://") {
        let db_path = database_url.trim_start_matches("sqlite://");
        let db_path = db_path.split('?').next().unwrap_or(db_path);
        let db_path = std::path::Path::new(db_path);

        if db_path.is_relative() && !db_path.as_os_str().is_empty() {
            tracing::warn!(
                "Database path '{}' is relative - behavior depends on current directory.",
                db_path.display()
            );
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
    }

    match cli.command {
        Commands::Serve { bind } => {
            commands::serve::handle_serve(&config, &database_url, bind).await?;
        }
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Discover {
            username,
            display_name,
            no_pacing,
        } => {
            commands::discover::handle_discover(
                &config,
                &database_url,
                &username,
                display_name.as_deref(),
                no_pacing,
            )
            .await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_discover_flags() {
        let cli = Cli::try_parse_from(["hubmirror", "discover", "octocat", "--no-pacing"]).unwrap();
        match cli.command {
            Commands::Discover {
                username,
                display_name,
                no_pacing,
            } => {
                assert_eq!(username, "octocat");
                assert!(display_name.is_none());
                assert!(no_pacing);
            }
            _ => panic!("expected discover"),
        }
    }
}
