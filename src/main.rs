//! tillvault CLI - exercise the session guard from the command line.
//!
//! Commands: `setup`, `status`, `login [--remember]`, `logout`,
//! `seal <json>`, `open <ciphertext>`. The volatile store dies with each
//! invocation, so only `--remember` sessions survive between commands.

use std::io;

use anyhow::{bail, Result};
use chrono::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tillvault::auth::{GuardOptions, SessionGuard};
use tillvault::config::{Config, DurableBackend, SALT_FILE};
use tillvault::crypto::KdfSalt;
use tillvault::store::{FileStore, KeyringStore, MemoryStore, SessionStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");

    match command {
        "setup" => cmd_setup(),
        "status" => cmd_status(),
        "login" => cmd_login(args.iter().any(|a| a == "--remember")),
        "logout" => cmd_logout(),
        "seal" => cmd_seal(args.get(2).map(String::as_str)),
        "open" => cmd_open(args.get(2).map(String::as_str)),
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n", other);
            print_usage();
            std::process::exit(2);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: tillvault <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  setup               Choose the application secret and write the config");
    eprintln!("  status              Check whether a session can be restored");
    eprintln!("  login [--remember]  Authenticate; --remember persists for 30 days");
    eprintln!("  logout              End the session and clear all stores");
    eprintln!("  seal <json>         Encrypt a JSON value for local storage");
    eprintln!("  open <ciphertext>   Decrypt a value produced by seal");
}

/// Assemble the guard from configuration: secret, salt, TTL overrides,
/// and the configured durable backend.
fn build_guard() -> Result<SessionGuard> {
    let config = Config::load()?;
    let Some(secret) = config.resolve_secret() else {
        bail!(
            "No application secret configured. Set {} or add \"shared_secret\" to the config file.",
            tillvault::config::SECRET_ENV_VAR
        );
    };

    let data_dir = config.data_dir()?;
    let salt = KdfSalt::load_or_create(&data_dir.join(SALT_FILE))?;

    let mut options = GuardOptions::new(secret, salt);
    if let Some(minutes) = config.short_session_minutes {
        options = options.with_short_ttl(Duration::minutes(minutes));
    }
    if let Some(days) = config.long_session_days {
        options = options.with_long_ttl(Duration::days(days));
    }

    let durable: Box<dyn SessionStore> = match config.durable_backend {
        DurableBackend::File => Box::new(FileStore::new(data_dir)),
        DurableBackend::Keyring => Box::new(KeyringStore::new()),
    };

    // The volatile store is scoped to this invocation, like a browser tab
    Ok(SessionGuard::new(options, durable, Box::new(MemoryStore::new())))
}

fn cmd_setup() -> Result<()> {
    let mut config = Config::load()?;
    if config.shared_secret.is_some() {
        eprintln!("A secret is already configured; it will be replaced.");
        eprintln!("Data sealed under the old secret becomes unrecoverable.");
    }

    let secret = rpassword::prompt_password("New secret: ")?;
    if secret.is_empty() {
        bail!("The secret must not be empty");
    }
    let confirm = rpassword::prompt_password("Confirm secret: ")?;
    if secret != confirm {
        bail!("Secrets do not match");
    }

    config.shared_secret = Some(secret);
    config.save()?;
    println!("Configuration written.");
    Ok(())
}

fn cmd_status() -> Result<()> {
    let mut guard = build_guard()?;
    if guard.initialize() {
        println!("Session: active");
    } else {
        println!("Session: none (login required)");
    }
    Ok(())
}

fn cmd_login(remember: bool) -> Result<()> {
    let mut guard = build_guard()?;
    let secret = rpassword::prompt_password("Secret: ")?;

    if guard.login(&secret, remember) {
        info!("Login succeeded");
        if remember {
            println!("Logged in. Session persists for 30 days.");
        } else {
            println!("Logged in for this invocation only. Use --remember to persist.");
        }
        Ok(())
    } else {
        eprintln!("Login failed: wrong secret.");
        std::process::exit(1);
    }
}

fn cmd_logout() -> Result<()> {
    let mut guard = build_guard()?;
    guard.initialize();
    guard.logout();
    println!("Logged out.");
    Ok(())
}

fn cmd_seal(arg: Option<&str>) -> Result<()> {
    let Some(raw) = arg else {
        bail!("seal requires a JSON argument, e.g.: tillvault seal '{{\"points\": 12}}'");
    };
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("Argument is not valid JSON: {}", e))?;

    let mut guard = build_guard()?;
    if !guard.initialize() {
        bail!("No active session. Run `tillvault login --remember` first.");
    }

    match guard.encrypt(&value) {
        Some(blob) => {
            println!("{}", blob);
            Ok(())
        }
        None => bail!("Encryption failed; see logs for details."),
    }
}

fn cmd_open(arg: Option<&str>) -> Result<()> {
    let Some(blob) = arg else {
        bail!("open requires a ciphertext argument");
    };

    let mut guard = build_guard()?;
    if !guard.initialize() {
        bail!("No active session. Run `tillvault login --remember` first.");
    }

    match guard.decrypt(blob) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => {
            eprintln!("Could not decrypt: wrong secret or corrupted ciphertext.");
            std::process::exit(1);
        }
    }
}
