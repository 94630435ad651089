use std::path::PathBuf;

use chrono::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::auth::TokenAuthority;
use crate::config::Config;
use crate::entity::{self, FollowUp, NewInquiry, User};
use crate::error::{CrmError, Result};
use crate::http;
use crate::storage::SqliteStore;

const SEED_ADMIN_NAME: &str = "Admin User";
const SEED_ADMIN_EMAIL: &str = "admin@example.com";
const SEED_FOLLOW_UP_NOTE: &str =
    "Initial contact made. Client interested in a WordPress site. Follow-up call scheduled for next week.";

fn load_config(database: Option<PathBuf>) -> Config {
    let mut config = Config::load();
    if let Some(database) = database {
        config.database = database;
    }
    config
}

fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.database)
}

pub fn handle_serve(database: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = load_config(database);
    if let Some(port) = port {
        config.port = port;
    }
    info!(?config, "Starting inquiry desk");

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(http::serve(config))
}

/// Idempotent: creates only what is missing, then prints row counts.
pub fn handle_setup(database: Option<PathBuf>) -> Result<()> {
    let config = load_config(database);
    let mut store = open_store(&config)?;
    let now = entity::now();

    println!("Setting up database at {}", config.database.display());

    if store.find_user_by_email(SEED_ADMIN_EMAIL)?.is_some() {
        println!("Admin user already exists");
    } else {
        store.create_user(&User::new(SEED_ADMIN_NAME.to_string(), SEED_ADMIN_EMAIL, now))?;
        println!("Admin user created: {}", SEED_ADMIN_EMAIL);
    }

    if store.stats()?.inquiries == 0 {
        let draft = NewInquiry {
            name: Some("Sample Client".to_string()),
            phone: Some("1234567890".to_string()),
            email: Some("client@example.com".to_string()),
            service_type: Some("Web Development".to_string()),
            message: Some("I need a website for my small business".to_string()),
        }
        .validate()?;
        let inquiry = store.create_inquiry(draft, now)?;

        let follow_up = FollowUp::new(
            inquiry.id,
            SEED_FOLLOW_UP_NOTE.to_string(),
            now + Duration::days(7),
            now,
        );
        store.insert_follow_up(&follow_up)?;
        println!(
            "Sample inquiry created with reference code: {}",
            inquiry.reference_code
        );
    } else {
        println!("Sample data already exists");
    }

    let stats = store.stats()?;
    println!("\nDatabase summary:");
    println!("  Users:      {}", stats.users);
    println!("  Inquiries:  {}", stats.inquiries);
    println!("  Follow-ups: {}", stats.follow_ups);
    println!("\nIssue an admin token with:");
    println!("  inquiry-desk token issue {}", SEED_ADMIN_EMAIL);

    Ok(())
}

pub fn handle_user_add(database: Option<PathBuf>, name: String, email: String) -> Result<()> {
    let name = entity::required_text("name", Some(name))?;
    let email = entity::required_text("email", Some(email))?;
    if !email.contains('@') {
        return Err(CrmError::validation(
            "email",
            format!("'{}' is not an email address", email),
        ));
    }

    let config = load_config(database);
    let store = open_store(&config)?;
    let user = User::new(name, &email, entity::now());
    store.create_user(&user)?;

    println!("Added user {} <{}> ({})", user.name, user.email, user.id);
    Ok(())
}

pub fn handle_user_list(database: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(database);
    let store = open_store(&config)?;
    let users = store.list_users()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
    } else if users.is_empty() {
        println!("No users found.");
    } else {
        println!("Users:\n");
        for user in users {
            println!(
                "  {} <{}>  added {}",
                user.name,
                user.email,
                user.created_at.format("%Y-%m-%d")
            );
        }
    }
    Ok(())
}

pub fn handle_user_remove(database: Option<PathBuf>, email: String) -> Result<()> {
    let config = load_config(database);
    let store = open_store(&config)?;

    if !store.remove_user(&email)? {
        return Err(CrmError::NotFound(format!("User {}", email.trim())));
    }
    println!("Removed user {}", email.trim().to_lowercase());
    Ok(())
}

/// Prints only the token, so the output can be captured by scripts.
pub fn handle_token_issue(
    database: Option<PathBuf>,
    email: String,
    ttl_hours: Option<i64>,
) -> Result<()> {
    let config = load_config(database);
    let authority = TokenAuthority::new(config.require_jwt_secret()?, config.token_ttl());
    let store = open_store(&config)?;

    let user = store
        .find_user_by_email(&email)?
        .ok_or_else(|| CrmError::NotFound(format!("User {}", email.trim())))?;

    let ttl = match ttl_hours {
        Some(hours) => Duration::try_hours(hours)
            .ok_or_else(|| CrmError::validation("ttl", "token lifetime is out of range"))?,
        None => authority.ttl(),
    };
    let token = authority.issue_with_ttl(&user, entity::now(), ttl)?;

    println!("{}", token);
    Ok(())
}
