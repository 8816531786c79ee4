use std::env;

use clap::Parser;

/// Startup configuration: the env surface of spec.md §6 plus the one CLI
/// flag. No config file — the surface is too small to justify one (see
/// `SPEC_FULL.md` §4.3).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub log_level: String,
    pub allow_unauthenticated_access: bool,
    pub user_in_header: String,
}

/// Jupyter-compatible kernel-management API server.
#[derive(Debug, Parser)]
#[command(name = "kernel-server", version)]
pub struct Cli {
    /// Port the HTTP server listens on.
    #[arg(long, default_value_t = 8888)]
    pub port: u16,
}

const TRUTHY: &[&str] = &["true", "1", "yes", "y", "t"];

impl Config {
    pub fn from_env_and_cli(cli: Cli) -> Self {
        Self {
            port: cli.port,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            allow_unauthenticated_access: env::var("ALLOW_UNAUTHENTICATED_ACCESS")
                .map(|v| TRUTHY.contains(&v.to_lowercase().as_str()))
                .unwrap_or(false),
            user_in_header: env::var("USER_IN_HEADER")
                .unwrap_or_else(|_| "X-Forwarded-User".to_string()),
        }
    }
}
