//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use storyfill_game::settings::GameSettings;

use crate::error::AppError;

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Connection pool size.
    pub database_max_connections: u32,
    /// Initial lobby countdown, in seconds.
    pub lobby_countdown_seconds: i32,
    /// Tick period and decrement, in seconds.
    pub lobby_tick_seconds: u32,
    /// Idle age after which sessions are swept, in hours.
    pub stale_session_hours: i64,
    /// Seed for reproducible games; entropy when unset.
    pub rng_seed: Option<u64>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any
    /// variable fails to parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable if set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or any
    /// variable fails to parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let lobby_countdown_seconds: i32 = parse_or(&lookup, "LOBBY_COUNTDOWN_SECONDS", 30)?;
        if lobby_countdown_seconds <= 0 {
            return Err(AppError::Config(
                "LOBBY_COUNTDOWN_SECONDS must be positive".to_owned(),
            ));
        }
        let lobby_tick_seconds: u32 = parse_or(&lookup, "LOBBY_TICK_SECONDS", 2)?;
        if lobby_tick_seconds == 0 {
            return Err(AppError::Config(
                "LOBBY_TICK_SECONDS must be positive".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            bind_addr,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            lobby_countdown_seconds,
            lobby_tick_seconds,
            stale_session_hours: parse_or(&lookup, "STALE_SESSION_HOURS", 24)?,
            rng_seed: lookup("RNG_SEED")
                .map(|raw| parse_value("RNG_SEED", &raw))
                .transpose()?,
        })
    }

    /// Game timing derived from this configuration.
    #[must_use]
    pub fn game_settings(&self) -> GameSettings {
        GameSettings::new(
            self.lobby_countdown_seconds,
            self.lobby_tick_seconds,
            self.stale_session_hours,
        )
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key} is invalid: {e}")))
}
