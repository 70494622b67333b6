//! Command line and environment configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use services::AuthSettings;
use thiserror::Error;

pub const DEFAULT_DB_URL: &str = "sqlite://mathwrks.sqlite3";
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_PORT: u16 = 5001;

const DEV_STUDENT_SECRET: &str = "mathwrks-student-secret-dev";
const DEV_TEACHER_SECRET: &str = "mathwrks-teacher-secret-dev";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid --db value: {raw}")]
    InvalidDbUrl { raw: String },
    #[error("could not prepare database file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Parser)]
#[command(name = "mathwrks", about = "Adaptive math quiz server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the JSON API.
    Serve(ServeArgs),
    /// Wipe the database and load the bundled catalog.
    Seed(SeedArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DbArgs {
    #[arg(long = "db", env = "MATHWRKS_DB_URL", default_value = DEFAULT_DB_URL)]
    pub db_url: String,
}

impl DbArgs {
    /// Absolute `sqlite://` URL with the backing file created.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for blank URLs or when the file cannot be created.
    pub fn prepared_url(&self) -> Result<String, ConfigError> {
        if self.db_url.trim().is_empty() {
            return Err(ConfigError::InvalidDbUrl {
                raw: self.db_url.clone(),
            });
        }
        let url = normalize_sqlite_url(&self.db_url);
        prepare_sqlite_file(&url)?;
        Ok(url)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SecretArgs {
    #[arg(long, env = "MATHWRKS_STUDENT_SECRET", hide_env_values = true)]
    pub student_secret: Option<String>,

    #[arg(long, env = "MATHWRKS_TEACHER_SECRET", hide_env_values = true)]
    pub teacher_secret: Option<String>,
}

impl SecretArgs {
    #[must_use]
    pub fn auth_settings(&self) -> AuthSettings {
        let student = self.student_secret.clone().unwrap_or_else(|| {
            tracing::warn!("MATHWRKS_STUDENT_SECRET not set, using development secret");
            DEV_STUDENT_SECRET.to_string()
        });
        let teacher = self.teacher_secret.clone().unwrap_or_else(|| {
            tracing::warn!("MATHWRKS_TEACHER_SECRET not set, using development secret");
            DEV_TEACHER_SECRET.to_string()
        });
        AuthSettings::new(student, teacher)
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub db: DbArgs,

    #[arg(long, env = "MATHWRKS_HOST", default_value_t = DEFAULT_HOST)]
    pub host: IpAddr,

    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[command(flatten)]
    pub secrets: SecretArgs,
}

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    #[command(flatten)]
    pub db: DbArgs,
}

#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file and its parent directories when missing.
///
/// # Errors
///
/// Returns `ConfigError` for URLs without a file path or on I/O failure.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), ConfigError> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let invalid = || ConfigError::InvalidDbUrl {
        raw: db_url.to_string(),
    };
    let path = db_url.strip_prefix("sqlite://").ok_or_else(invalid)?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(invalid());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_relative_paths_to_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/app.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/app.sqlite3"));

        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/x.sqlite3"),
            "sqlite:///tmp/x.sqlite3"
        );
    }

    #[test]
    fn rejects_urls_without_a_path() {
        assert!(matches!(
            prepare_sqlite_file("postgres://db"),
            Err(ConfigError::InvalidDbUrl { .. })
        ));
        assert!(matches!(
            prepare_sqlite_file("sqlite://"),
            Err(ConfigError::InvalidDbUrl { .. })
        ));
    }

    #[test]
    fn serve_defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["mathwrks", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.host, DEFAULT_HOST);
        // PORT may be set in CI; only check the flag override.
        let cli = Cli::try_parse_from(["mathwrks", "serve", "--port", "8080"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8080);
    }
}
