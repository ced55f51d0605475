use crate::app_config::{AccountConfig, AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    // Blank values count as unset so `KEY=` in a .env file behaves like a missing key.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("NEARBITE_ENV", "development"))?;

    let bind_addr = or_default("NEARBITE_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("NEARBITE_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("NEARBITE_LOG_LEVEL", "info");

    let google_maps_api_key = optional("GOOGLE_MAPS_API_KEY");
    let database_url = optional("DATABASE_URL");
    let account = parse_account(
        optional("APP_USERNAME"),
        optional("APP_PASSWORD"),
        optional("APP_SESSION_SECRET"),
    )?;

    let db_max_connections = parse_u32("NEARBITE_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("NEARBITE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("NEARBITE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let places_timeout_secs = parse_u64("NEARBITE_PLACES_TIMEOUT_SECS", "8")?;
    let places_max_retries = parse_u32("NEARBITE_PLACES_MAX_RETRIES", "1")?;
    let places_retry_backoff_ms = parse_u64("NEARBITE_PLACES_RETRY_BACKOFF_MS", "250")?;

    let enrich_concurrency = parse_usize("NEARBITE_ENRICH_CONCURRENCY", "8")?;
    if enrich_concurrency == 0 {
        return Err(invalid(
            "NEARBITE_ENRICH_CONCURRENCY",
            "must be at least 1".to_string(),
        ));
    }

    let rate_limit_per_minute = parse_usize("NEARBITE_RATE_LIMIT_PER_MINUTE", "120")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        google_maps_api_key,
        database_url,
        account,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        places_timeout_secs,
        places_max_retries,
        places_retry_backoff_ms,
        enrich_concurrency,
        rate_limit_per_minute,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "NEARBITE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// The account is all-or-nothing: none of the three vars disables login,
/// a partial set is a startup error naming the first missing var.
fn parse_account(
    username: Option<String>,
    password: Option<String>,
    session_secret: Option<String>,
) -> Result<Option<AccountConfig>, ConfigError> {
    match (username, password, session_secret) {
        (None, None, None) => Ok(None),
        (Some(username), Some(password), Some(session_secret)) => Ok(Some(AccountConfig {
            username,
            password,
            session_secret,
        })),
        (username, password, _) => {
            let missing = if username.is_none() {
                "APP_USERNAME"
            } else if password.is_none() {
                "APP_PASSWORD"
            } else {
                "APP_SESSION_SECRET"
            };
            Err(ConfigError::MissingEnvVar(missing.to_string()))
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
