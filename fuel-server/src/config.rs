//! Server configuration from environment variables.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

/// Error loading the server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings the binary needs at start-up.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Backend project URL, e.g. `https://xyz.supabase.co`
    pub backend_url: String,
    /// Public anon key sent with every backend request
    pub anon_key: String,
    pub bind_addr: SocketAddr,
    /// Station directory snapshot file
    pub station_cache_path: PathBuf,
    pub station_refresh: Duration,
}

impl ServerConfig {
    /// Read `FUEL_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let backend_url = required("FUEL_BACKEND_URL")?;
        let anon_key = required("FUEL_BACKEND_ANON_KEY")?;
        let refresh_secs: u64 = parse_or(&lookup, "FUEL_STATION_REFRESH_SECS", "86400")?;
        if refresh_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "FUEL_STATION_REFRESH_SECS",
                value: refresh_secs.to_string(),
                reason: "refresh interval must be at least one second".to_string(),
            });
        }

        Ok(Self {
            backend_url,
            anon_key,
            bind_addr: parse_or(&lookup, "FUEL_BIND_ADDR", "127.0.0.1:3000")?,
            station_cache_path: parse_or(&lookup, "FUEL_STATION_CACHE", "stations_cache.json")?,
            station_refresh: Duration::from_secs(refresh_secs),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("FUEL_BACKEND_URL", "https://demo.supabase.co"),
        ("FUEL_BACKEND_ANON_KEY", "anon-key"),
    ];

    #[test]
    fn defaults_applied() {
        let config = ServerConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.backend_url, "https://demo.supabase.co");
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.station_cache_path, PathBuf::from("stations_cache.json"));
        assert_eq!(config.station_refresh, Duration::from_secs(86400));
    }

    #[test]
    fn overrides_parsed() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FUEL_BIND_ADDR", "0.0.0.0:8080"));
        vars.push(("FUEL_STATION_REFRESH_SECS", " 3600 "));
        vars.push(("FUEL_STATION_CACHE", "/var/cache/fuel/stations.json"));
        let config = ServerConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.station_refresh, Duration::from_secs(3600));
        assert_eq!(
            config.station_cache_path,
            PathBuf::from("/var/cache/fuel/stations.json")
        );
    }

    #[test]
    fn missing_required() {
        let err = ServerConfig::from_lookup(lookup(&[("FUEL_BACKEND_URL", "https://x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FUEL_BACKEND_ANON_KEY")));

        let err = ServerConfig::from_lookup(lookup(&[
            ("FUEL_BACKEND_URL", "  "),
            ("FUEL_BACKEND_ANON_KEY", "k"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FUEL_BACKEND_URL")));
    }

    #[test]
    fn invalid_value_reported() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FUEL_BIND_ADDR", "localhost"));
        let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
        match err {
            ConfigError::Invalid { key, value, .. } => {
                assert_eq!(key, "FUEL_BIND_ADDR");
                assert_eq!(value, "localhost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_refresh_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FUEL_STATION_REFRESH_SECS", "0"));
        let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "FUEL_STATION_REFRESH_SECS",
                ..
            }
        ));
    }
}
