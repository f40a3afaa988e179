use crate::app_config::{AnalyticsMode, AppConfig, Environment, DEFAULT_KML_URL, DEFAULT_WFS_URL};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable config.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("HKMP_ENV", "development"))?;
    let log_level = or_default("HKMP_LOG_LEVEL", "info");
    let kml_url = or_default("HKMP_KML_URL", DEFAULT_KML_URL);
    let fallback_kml = or_default("HKMP_FALLBACK_KML", "./output.kml");
    let wfs_url = or_default("HKMP_WFS_URL", DEFAULT_WFS_URL);

    let request_timeout_secs = parse_u64("HKMP_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("HKMP_USER_AGENT", "hkmp/0.1 (motorcycle-parking)");
    let max_retries = parse_u32("HKMP_MAX_RETRIES", "0")?;
    let retry_backoff_base_ms = parse_u64("HKMP_RETRY_BACKOFF_BASE_MS", "500")?;

    let app_fallback_delay_ms = parse_u64("HKMP_APP_FALLBACK_DELAY_MS", "1500")?;
    let app_safety_timeout_ms = parse_u64("HKMP_APP_SAFETY_TIMEOUT_MS", "3000")?;
    if app_safety_timeout_ms < app_fallback_delay_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "HKMP_APP_SAFETY_TIMEOUT_MS".to_string(),
            reason: format!(
                "safety timeout ({app_safety_timeout_ms} ms) must not be shorter than the fallback delay ({app_fallback_delay_ms} ms)"
            ),
        });
    }

    let amap_source_app = or_default("HKMP_AMAP_SOURCE_APP", "hkmp");
    let baidu_src = or_default("HKMP_BAIDU_SRC", "webapp.baidu.openAPIdemo");
    let analytics = parse_analytics_mode(&or_default("HKMP_ANALYTICS", "tracing"))?;

    Ok(AppConfig {
        env,
        log_level,
        kml_url,
        fallback_kml,
        wfs_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        app_fallback_delay_ms,
        app_safety_timeout_ms,
        amap_source_app,
        baidu_src,
        analytics,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HKMP_ENV".to_string(),
            reason: format!("expected development, test, or production; got \"{other}\""),
        }),
    }
}

fn parse_analytics_mode(s: &str) -> Result<AnalyticsMode, ConfigError> {
    match s {
        "tracing" => Ok(AnalyticsMode::Tracing),
        "off" => Ok(AnalyticsMode::Off),
        other => Err(ConfigError::InvalidEnvVar {
            var: "HKMP_ANALYTICS".to_string(),
            reason: format!("expected tracing or off; got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
