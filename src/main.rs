//! CodeArena Operations Console
//!
//! Command-line front office and back office for the CodeArena platform.
//!
//! # Configuration
//!
//! Environment variables:
//! - `CODEARENA_API_URL`: Platform API base URL (default: http://localhost:8080/api)
//! - `CODEARENA_STATE_DIR`: Session state directory
//! - `CODEARENA_POLL_INTERVAL`: Telemetry polling interval in seconds
//! - `CODEARENA_LOG_LEVEL`: Log level (default: info)
//! - `CODEARENA_LOG_FORMAT`: pretty or json
//! - `RUST_LOG`: Overrides the log filter entirely

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codearena::api::{ApiClient, ApiClientConfig};
use codearena::config::{generate_default_config, Config};
use codearena::monitor::{HealthMonitor, OpsSnapshot};
use codearena::session::{
    FileSessionStore, LoginOutcome, Role, SessionManager, SessionStore, TwoFactorMethod,
};
use codearena::users::{User, UserListFilter, UserPatch, UserService};
use codearena::{export, validate};

#[derive(Parser)]
#[command(name = "codearena", version, about = "CodeArena platform operations console")]
struct Cli {
    /// Config file path (defaults to the standard locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in, with two-factor step-up when the account requires it
    Login { username: String },

    /// Create an account (sign in separately afterwards)
    Register { username: String, email: String },

    /// Drop the local session
    Logout,

    /// Show the current session and its landing destination
    Whoami,

    /// Profile operations
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Upload a new avatar image
    Avatar { path: PathBuf },

    /// Change the account password
    Passwd,

    /// Back office: user administration
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Platform health telemetry
    Health {
        /// Keep polling at the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Active platform sessions
    Sessions,

    /// Write a default config file
    ConfigInit {
        /// Target path (default: ./codearena.toml)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the stored profile
    Show,

    /// Update profile fields
    Set {
        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List platform users
    List {
        /// Filter by username/email substring
        #[arg(long)]
        search: Option<String>,

        /// Filter by role (admin, organizer, member)
        #[arg(long)]
        role: Option<String>,

        /// Export the listing to a CSV file instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Delete a user account
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config);

    if let Command::ConfigInit { path } = &cli.command {
        return cmd_config_init(path.as_deref());
    }

    let store: Arc<dyn SessionStore> = Arc::new(
        FileSessionStore::new(Path::new(&config.session.state_dir))
            .with_token_ttl_days(config.session.token_ttl_days),
    );
    let client = Arc::new(ApiClient::new(
        ApiClientConfig {
            base_url: config.api.base_url.clone(),
            request_timeout_ms: config.api.request_timeout_ms,
        },
        store,
    ));
    let session = SessionManager::new(client.clone());
    let users = UserService::new(client.clone());

    match cli.command {
        Command::Login { username } => cmd_login(&session, &username).await,
        Command::Register { username, email } => cmd_register(&session, &username, &email).await,
        Command::Logout => {
            session.logout().await?;
            println!("Signed out");
            Ok(())
        }
        Command::Whoami => cmd_whoami(&session).await,
        Command::Profile { action } => cmd_profile(&session, &users, action).await,
        Command::Avatar { path } => cmd_avatar(&session, &users, &path).await,
        Command::Passwd => cmd_passwd(&users).await,
        Command::Users { action } => cmd_users(&users, action).await,
        Command::Health { watch } => {
            cmd_health(client.clone(), config.monitor.poll_interval_secs, watch).await
        }
        Command::Sessions => cmd_sessions(client.clone()).await,
        Command::ConfigInit { .. } => unreachable!("handled before session setup"),
    }
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("codearena={}", config.logging.level))
    });

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

// ============================================
// Commands
// ============================================

async fn cmd_login(session: &SessionManager, username: &str) -> anyhow::Result<()> {
    let password = prompt("Password: ")?;

    match session.login(username, &password).await? {
        LoginOutcome::LoggedIn(user) => print_signed_in(session, &user).await,
        LoginOutcome::TwoFactorRequired(mut flow) => {
            let method = loop {
                let answer = prompt("Verification method (email/sms): ")?;
                match TwoFactorMethod::parse(&answer) {
                    Some(method) => break method,
                    None => eprintln!("Unknown method, choose email or sms"),
                }
            };

            flow.send_code(method).await?;
            println!("Code sent via {}", method);

            let code = prompt("6-digit code: ")?;
            let token = flow.verify(&code).await?;
            let user = session.complete_two_factor(&token).await?;
            print_signed_in(session, &user).await;
        }
    }

    Ok(())
}

async fn print_signed_in(session: &SessionManager, user: &User) {
    let role = user
        .role
        .map(|r| r.to_string())
        .unwrap_or_else(|| "no role".to_string());
    println!("Signed in as {} ({})", user.username, role);
    println!("Landing: {}", session.landing_destination().await.path());
}

async fn cmd_register(session: &SessionManager, username: &str, email: &str) -> anyhow::Result<()> {
    let password = prompt("Password: ")?;

    let strength = validate::password_strength(&password);
    if let Some(label) = strength.label {
        println!("Password strength: {} ({}/4)", label, strength.score);
    }

    session.signup(username, email, &password).await?;
    println!("Account {} registered, sign in with `codearena login`", username);
    Ok(())
}

async fn cmd_whoami(session: &SessionManager) -> anyhow::Result<()> {
    match session.rehydrate().await? {
        Some(user) => {
            print_user(&user);
            println!("Landing: {}", session.landing_destination().await.path());
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn cmd_profile(
    session: &SessionManager,
    users: &UserService,
    action: ProfileAction,
) -> anyhow::Result<()> {
    match action {
        ProfileAction::Show => match session.rehydrate().await? {
            Some(user) => print_user(&user),
            None => println!("Not signed in"),
        },
        ProfileAction::Set {
            username,
            email,
            bio,
        } => {
            let patch = UserPatch {
                username,
                email,
                bio,
                ..Default::default()
            };

            // The server's merged record is the truth, not the patch we sent
            let updated = users.update_me(&patch).await?;
            session.adopt_user(updated.clone()).await?;
            print_user(&updated);
        }
    }
    Ok(())
}

async fn cmd_avatar(
    session: &SessionManager,
    users: &UserService,
    path: &Path,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("avatar")
        .to_string();

    let updated = users
        .upload_avatar_me(&file_name, mime_for(path), bytes)
        .await?;
    session.adopt_user(updated.clone()).await?;

    match updated.avatar {
        Some(url) => println!("Avatar updated: {}", url),
        None => println!("Avatar updated"),
    }
    Ok(())
}

async fn cmd_passwd(users: &UserService) -> anyhow::Result<()> {
    let current = prompt("Current password: ")?;
    let new = prompt("New password: ")?;

    let strength = validate::password_strength(&new);
    match strength.label {
        Some(label) => println!("Password strength: {} ({}/4)", label, strength.score),
        None => println!("Password strength: too weak to rate"),
    }

    users.change_password(&current, &new).await?;
    println!("Password changed");
    Ok(())
}

async fn cmd_users(users: &UserService, action: UsersAction) -> anyhow::Result<()> {
    match action {
        UsersAction::List { search, role, csv } => {
            let filter = UserListFilter {
                search,
                role: role.as_deref().map(Role::parse),
            };
            let listing = users.list(&filter).await?;

            match csv {
                Some(path) => {
                    export::write_users_csv(&path, &listing)?;
                    println!("Exported {} users to {:?}", listing.len(), path);
                }
                None => {
                    for user in &listing {
                        let role = user
                            .role
                            .map(|r| r.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!("{:<24} {:<32} {}", user.username, user.email, role);
                    }
                    println!("{} users", listing.len());
                }
            }
        }
        UsersAction::Delete { id } => {
            let answer = prompt(&format!("Delete user {}? (y/N): ", id))?;
            if answer.eq_ignore_ascii_case("y") {
                users.delete(&id).await?;
                println!("User {} deleted", id);
            } else {
                println!("Aborted");
            }
        }
    }
    Ok(())
}

async fn cmd_health(
    client: Arc<ApiClient>,
    poll_interval_secs: u64,
    watch: bool,
) -> anyhow::Result<()> {
    let monitor = Arc::new(HealthMonitor::new(client, poll_interval_secs));

    if !watch {
        print_snapshot(&monitor.snapshot().await?);
        return Ok(());
    }

    println!(
        "Watching platform health every {}s (ctrl-c to stop)",
        poll_interval_secs
    );
    let handle = monitor.clone().start();

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
    let mut last_printed: Option<DateTime<Utc>> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if let Some(snapshot) = monitor.latest().await {
                    if last_printed != Some(snapshot.fetched_at) {
                        last_printed = Some(snapshot.fetched_at);
                        print_snapshot(&snapshot);
                    }
                }
            }
        }
    }

    monitor.stop().await;
    handle.abort();
    Ok(())
}

async fn cmd_sessions(client: Arc<ApiClient>) -> anyhow::Result<()> {
    let monitor = HealthMonitor::new(client, 1);
    let active = monitor.active_sessions().await?;

    for session in &active.sessions {
        println!(
            "{:<24} {:<16} {}",
            session.username.as_deref().unwrap_or("-"),
            session.ip.as_deref().unwrap_or("-"),
            session
                .last_seen
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    println!("{} active sessions", active.count);
    Ok(())
}

fn cmd_config_init(path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| Path::new("./codearena.toml"));
    if path.exists() {
        bail!("{:?} already exists, refusing to overwrite", path);
    }
    std::fs::write(path, generate_default_config())
        .with_context(|| format!("Failed to write {:?}", path))?;
    println!("Wrote default config to {:?}", path);
    Ok(())
}

// ============================================
// Helpers
// ============================================

fn print_user(user: &User) {
    println!("Username:  {}", user.username);
    println!("Email:     {}", user.email);
    if let Some(role) = user.role {
        println!("Role:      {}", role);
    }
    if let Some(bio) = &user.bio {
        println!("Bio:       {}", bio);
    }
    if let Some(avatar) = &user.avatar {
        println!("Avatar:    {}", avatar);
    }
    println!("Verified:  {}", user.email_verified);
    println!("2FA:       {}", user.two_factor_enabled);
}

fn print_snapshot(snapshot: &OpsSnapshot) {
    println!(
        "[{}] status={} uptime={}s active_sessions={}",
        snapshot.fetched_at.format("%H:%M:%S"),
        snapshot.health.status,
        snapshot.health.uptime_seconds,
        snapshot.active_sessions.count
    );
    for (component, status) in &snapshot.health.components {
        println!("  {:<16} {}", component, status);
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn prompt(message: &str) -> anyhow::Result<String> {
    eprint!("{}", message);
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}
