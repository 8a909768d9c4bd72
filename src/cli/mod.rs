//! Command-line interface for the WSOPTV client.

pub mod auth;
pub mod browse;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::content::ContentSortOption;

/// WSOPTV command-line client
#[derive(Parser, Debug)]
#[command(name = "wsoptv", version, about = "WSOPTV command-line client")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// List contents
    Contents(ContentsArgs),
    /// Full-text search
    Search(SearchArgs),
    /// Resolve a content's stream and timeline
    Stream(StreamArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Sign in and store tokens locally
    Login(LoginArgs),
    /// Show the signed-in user
    Status,
    /// Sign out and forget stored tokens
    Logout,
}

/// Arguments for `wsoptv auth login`.
#[derive(Parser, Debug)]
pub struct LoginArgs {
    pub username: String,

    /// Password; read from WSOPTV_PASSWORD or stdin when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Arguments for `wsoptv contents`.
#[derive(Parser, Debug)]
pub struct ContentsArgs {
    /// Catalog id, e.g. `wsop-main-event`
    #[arg(long)]
    pub catalog: Option<String>,

    #[arg(long)]
    pub season: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// recent, episode, popular or hands
    #[arg(long)]
    pub sort: Option<ContentSortOption>,
}

/// Arguments for `wsoptv search`.
#[derive(Parser, Debug)]
pub struct SearchArgs {
    pub query: String,

    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long)]
    pub limit: Option<u32>,
}

/// Arguments for `wsoptv stream`.
#[derive(Parser, Debug)]
pub struct StreamArgs {
    pub content_id: i64,
}
