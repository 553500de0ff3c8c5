use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    /// How long a writer waits for SQLite's write lock before giving up.
    pub database_busy_timeout_secs: u64,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Number of options every authored question must carry.
    pub expected_option_count: usize,
    /// When false a student gets exactly one attempt per exam.
    pub allow_retakes: bool,
    pub seed_teacher_username: Option<String>,
    pub seed_teacher_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:3000"),
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 5)?,
            database_busy_timeout_secs: get_env_parse_or("DATABASE_BUSY_TIMEOUT_SECS", 10)?,
            jwt_secret: get_env("JWT_SECRET")?,
            token_ttl_hours: get_env_parse_or("TOKEN_TTL_HOURS", 12)?,
            expected_option_count: get_env_parse_or("EXPECTED_OPTION_COUNT", 4)?,
            allow_retakes: get_env_parse_or("ALLOW_RETAKES", true)?,
            seed_teacher_username: env::var("SEED_TEACHER_USERNAME").ok(),
            seed_teacher_password: env::var("SEED_TEACHER_PASSWORD").ok(),
        })
    }
}

impl Default for Config {
    /// In-memory database and a throwaway secret; meant for tests and local runs.
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:3000".to_string(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            database_busy_timeout_secs: 10,
            jwt_secret: "insecure-dev-secret".to_string(),
            token_ttl_hours: 12,
            expected_option_count: 4,
            allow_retakes: true,
            seed_teacher_username: None,
            seed_teacher_password: None,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
