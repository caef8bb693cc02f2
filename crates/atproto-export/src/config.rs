use std::time::Duration;

use atproto_identity::{ResolverConfig, DEFAULT_HANDLE_RESOLVER_URL, DEFAULT_PLC_DIRECTORY_URL};

use crate::error::{ExportError, Result};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub plc_directory_url: String,
    pub handle_resolver_url: String,
    /// Try `https://<handle>/.well-known/atproto-did` before the XRPC resolver
    pub resolve_handle_well_known: bool,
    pub http_timeout: Duration,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            plc_directory_url: DEFAULT_PLC_DIRECTORY_URL.to_string(),
            handle_resolver_url: DEFAULT_HANDLE_RESOLVER_URL.to_string(),
            resolve_handle_well_known: true,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ExportConfig {
    /// Build a config from a variable lookup, falling back to defaults for
    /// anything unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let plc_directory_url = lookup("PLC_DIRECTORY_URL").unwrap_or(defaults.plc_directory_url);
        let handle_resolver_url =
            lookup("HANDLE_RESOLVER_URL").unwrap_or(defaults.handle_resolver_url);

        let resolve_handle_well_known = match lookup("RESOLVE_HANDLE_WELL_KNOWN") {
            None => defaults.resolve_handle_well_known,
            Some(v) => parse_bool(&v).ok_or_else(|| {
                ExportError::Config(format!("RESOLVE_HANDLE_WELL_KNOWN must be true or false, got {v}"))
            })?,
        };

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            None => defaults.http_timeout,
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    ExportError::Config(format!(
                        "HTTP_TIMEOUT_SECS must be a positive number of seconds, got {v}"
                    ))
                })?,
        };

        Ok(Self {
            plc_directory_url,
            handle_resolver_url,
            resolve_handle_well_known,
            http_timeout,
        })
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            plc_directory_url: self.plc_directory_url.clone(),
            handle_resolver_url: self.handle_resolver_url.clone(),
            well_known_handles: self.resolve_handle_well_known,
            timeout: self.http_timeout,
        }
    }
}

/// Load configuration from the environment
pub fn load_config() -> Result<ExportConfig> {
    ExportConfig::from_lookup(|name| std::env::var(name).ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
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
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExportConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.plc_directory_url, "https://plc.directory");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.resolve_handle_well_known);
    }

    #[test]
    fn test_overrides() {
        let config = ExportConfig::from_lookup(lookup(&[
            ("PLC_DIRECTORY_URL", "http://127.0.0.1:2582"),
            ("HANDLE_RESOLVER_URL", "http://127.0.0.1:2583"),
            ("RESOLVE_HANDLE_WELL_KNOWN", "false"),
            ("HTTP_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.plc_directory_url, "http://127.0.0.1:2582");
        assert_eq!(config.handle_resolver_url, "http://127.0.0.1:2583");
        assert!(!config.resolve_handle_well_known);
        assert_eq!(config.http_timeout, Duration::from_secs(5));

        let resolver = config.resolver_config();
        assert!(!resolver.well_known_handles);
        assert_eq!(resolver.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        for (name, value) in [
            ("HTTP_TIMEOUT_SECS", "soon"),
            ("HTTP_TIMEOUT_SECS", "0"),
            ("RESOLVE_HANDLE_WELL_KNOWN", "maybe"),
        ] {
            let err = ExportConfig::from_lookup(lookup(&[(name, value)])).unwrap_err();
            assert!(matches!(err, ExportError::Config(msg) if msg.contains(name)));
        }
    }
}
