//! PhotoFeed CLI
//!
//! Command-line client for the PhotoFeed engine.
//!
//! # Commands
//!
//! - `authorize-url` - Print the page to open in a browser to grant access
//! - `login` - Exchange an authorization code for an access token
//! - `feed` - Load feed pages and list the photos
//! - `like` - Toggle the like on a photo
//! - `profile` - Show the logged-in user's profile
//! - `logout` - Forget the stored access token

mod commands;

use clap::{Parser, Subcommand};
use commands::{OutputFormat, Session};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// PhotoFeed command-line client.
#[derive(Parser)]
#[command(name = "photofeed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the access token
    #[arg(global = true, long, env = "PHOTOFEED_TOKEN_FILE", default_value = ".photofeed_token")]
    token_file: PathBuf,

    /// OAuth access key (client id)
    #[arg(global = true, long, env = "PHOTOFEED_ACCESS_KEY", default_value = "")]
    access_key: String,

    /// OAuth secret key (client secret)
    #[arg(global = true, long, env = "PHOTOFEED_SECRET_KEY", default_value = "", hide_env_values = true)]
    secret_key: String,

    /// Photo API base URL
    #[arg(global = true, long, env = "PHOTOFEED_API_BASE")]
    api_base: Option<String>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout_secs: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization page URL
    AuthorizeUrl,

    /// Exchange an authorization code for an access token
    Login {
        /// Authorization code shown after granting access
        #[arg(short, long)]
        code: String,
    },

    /// Load feed pages and list the photos
    Feed {
        /// Number of pages to load
        #[arg(short, long, default_value = "1")]
        pages: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Toggle the like on a photo
    Like {
        /// Row of the photo in the feed
        #[arg(short, long)]
        index: usize,
    },

    /// Show the logged-in user's profile
    Profile {
        /// Also fetch the avatar URL
        #[arg(short, long)]
        avatar: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Forget the stored access token
    Logout,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = Session {
        token_file: cli.token_file,
        access_key: cli.access_key,
        secret_key: cli.secret_key,
        api_base: cli.api_base,
        timeout_secs: cli.timeout_secs,
    };

    match cli.command {
        Commands::AuthorizeUrl => commands::auth::authorize_url(&session)?,
        Commands::Login { code } => commands::auth::login(&session, &code).await?,
        Commands::Feed { pages, format } => commands::feed::list(&session, pages, format).await?,
        Commands::Like { index } => commands::feed::like(&session, index).await?,
        Commands::Profile { avatar, format } => {
            commands::profile::run(&session, avatar, format).await?
        }
        Commands::Logout => commands::auth::logout(&session).await?,
        Commands::Version => {
            println!("PhotoFeed CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
