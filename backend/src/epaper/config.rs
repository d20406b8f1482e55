// config.rs
use std::{path::PathBuf, time::Duration};
use tracing::warn;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_EPAPER_DIR: &str = "./epaper";

// --- Server configuration ---
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub epaper_dir: PathBuf,
    /// None disables the periodic reload ticker.
    pub reload_interval: Option<Duration>,
    pub reload_on_sighup: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            epaper_dir: PathBuf::from(DEFAULT_EPAPER_DIR),
            reload_interval: None,
            reload_on_sighup: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("HOST")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.host);

        let port = parse_or("PORT", lookup("PORT"), defaults.port);

        let epaper_dir = lookup("EPAPER_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.epaper_dir);

        let reload_secs: u64 = parse_or("CATALOG_RELOAD_SECS", lookup("CATALOG_RELOAD_SECS"), 0);
        let reload_interval = (reload_secs > 0).then(|| Duration::from_secs(reload_secs));

        let reload_on_sighup = match lookup("CATALOG_RELOAD_ON_SIGHUP").as_deref().map(str::trim) {
            None | Some("") => defaults.reload_on_sighup,
            Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
            Some(v) => {
                warn!(value = %v, "invalid CATALOG_RELOAD_ON_SIGHUP; using default");
                defaults.reload_on_sighup
            }
        };

        Self {
            host,
            port,
            epaper_dir,
            reload_interval,
            reload_on_sighup,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) if v.trim().is_empty() => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!(%key, value = %v, "unparseable value; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config(&[]);
        assert_eq!(cfg, ServerConfig::default());
        assert_eq!(cfg.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("EPAPER_DIR", "/srv/epaper"),
            ("CATALOG_RELOAD_SECS", "30"),
            ("CATALOG_RELOAD_ON_SIGHUP", "false"),
        ]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.epaper_dir, PathBuf::from("/srv/epaper"));
        assert_eq!(cfg.reload_interval, Some(Duration::from_secs(30)));
        assert!(!cfg.reload_on_sighup);
    }

    #[test]
    fn bad_numbers_fall_back_to_defaults() {
        let cfg = config(&[("PORT", "eighty"), ("CATALOG_RELOAD_SECS", "-5")]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.reload_interval, None);
    }

    #[test]
    fn zero_interval_disables_periodic_reload() {
        assert_eq!(config(&[("CATALOG_RELOAD_SECS", "0")]).reload_interval, None);
    }

    #[test]
    fn unknown_sighup_flag_keeps_default() {
        assert!(config(&[("CATALOG_RELOAD_ON_SIGHUP", "maybe")]).reload_on_sighup);
        assert!(config(&[("CATALOG_RELOAD_ON_SIGHUP", "1")]).reload_on_sighup);
    }
}
