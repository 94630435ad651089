use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "inquiry-desk")]
#[command(version, about = "Client inquiry intake, tracking and follow-up")]
#[command(propagate_version = true)]
pub struct Cli {
    /// SQLite database file (overrides CRM_DATABASE)
    #[arg(long, global = true, value_name = "PATH")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides CRM_PORT)
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },

    /// Create the schema and seed an admin and a sample inquiry if missing
    Setup,

    /// Manage admin identities
    User(UserCommand),

    /// Mint bearer tokens
    Token(TokenCommand),
}

#[derive(Args, Debug)]
pub struct UserCommand {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand, Debug)]
pub enum UserAction {
    /// Register an admin identity
    Add {
        /// Display name
        name: String,

        /// Email address (unique, case-insensitive)
        email: String,
    },

    /// List admin identities
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an admin identity; its tokens stop working
    Remove {
        /// Email address
        email: String,
    },
}

#[derive(Args, Debug)]
pub struct TokenCommand {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Issue a token for an existing identity
    Issue {
        /// Email address of the identity
        email: String,

        /// Token lifetime in hours (overrides CRM_TOKEN_TTL_HOURS)
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
}
