//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::password::hash_password;
use crate::rate_limit::RateLimitConfig;
use clap::Parser;
use rand::Rng;
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Linkfolio",
    about = "REST backend for a professional-profile network"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7420")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "linkfolio.db")]
    pub database: String,

    /// Public origin the server is reached at (e.g., "https://folio.example.com").
    /// Cookies carry the Secure flag when this uses HTTPS
    #[arg(long, default_value = "http://localhost:7420")]
    pub public_origin: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Create a new admin user on startup and print its credentials
    #[arg(long)]
    pub create_admin: bool,

    /// Disable new user signups (admin creation via --create-admin still works)
    #[arg(long)]
    pub no_signup: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the public-origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Handle the --create-admin flag: create an admin account with a generated
/// password and print the credentials once.
pub async fn handle_create_admin(db: &Database) {
    let username = "admin";

    match db.users().get_by_username(username).await {
        Ok(Some(_)) => {
            println!();
            println!("Admin user already exists: {}", username);
            println!();
        }
        Ok(None) => {
            let uuid = Uuid::new_v4().to_string();
            let password = generate_password();
            let Ok(password_hash) = hash_password(&password) else {
                error!("Failed to hash admin password");
                std::process::exit(1);
            };

            let created = db
                .users()
                .create_admin(
                    &uuid,
                    username,
                    "admin@localhost",
                    &password_hash,
                    "Administrator",
                )
                .await;

            match created {
                Ok(user_id) => {
                    if let Err(e) = db.profiles().create_empty(user_id).await {
                        error!(error = %e, "Failed to create admin profile");
                        std::process::exit(1);
                    }
                    println!();
                    println!("Admin user created: {}", username);
                    println!("Password (shown once): {}", password);
                    println!();
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Generate a random 24-character alphanumeric password.
fn generate_password() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::rng();
    (0..24)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Build ServerConfig from validated arguments.
/// Cookies carry the Secure flag exactly when the public origin is HTTPS.
pub fn build_config(
    db: Database,
    public_origin: &Url,
    jwt_secret: String,
    no_signup: bool,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        secure_cookies: public_origin.scheme() == "https",
        no_signup,
        rate_limits: RateLimitConfig::new(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
