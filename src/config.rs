//! Configuración desde variables de entorno (con `.env` opcional).
//!
//! - `DEGREEPATH_STORE_URL`: `json://<dir>`, `sqlite://<archivo>`,
//!   `file://<archivo>` o una ruta simple (default `json://data`)
//! - `DEGREEPATH_LOG`: filtro de `tracing` (default `info`)

use std::env;
use std::path::PathBuf;

use crate::error::StoreError;

pub const STORE_URL_VAR: &str = "DEGREEPATH_STORE_URL";
pub const LOG_VAR: &str = "DEGREEPATH_LOG";

const DEFAULT_STORE_URL: &str = "json://data";
const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_url: String,
    pub log_filter: String,
}

/// Backend resuelto a partir de `store_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Json(PathBuf),
    Sqlite(PathBuf),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_url: DEFAULT_STORE_URL.to_string(),
            log_filter: DEFAULT_LOG.to_string(),
        }
    }
}

impl Config {
    /// Carga `.env` si existe y lee las variables del proceso.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Igual que `from_env` pero con una función de búsqueda arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Config {
            store_url: read(STORE_URL_VAR, DEFAULT_STORE_URL),
            log_filter: read(LOG_VAR, DEFAULT_LOG),
        }
    }

    pub fn store_location(&self) -> Result<StoreLocation, StoreError> {
        let url = self.store_url.trim();
        // sqlite:///ruta/absoluta y sqlite://ruta/relativa
        if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("file://")) {
            return non_empty(url, path).map(StoreLocation::Sqlite);
        }
        if let Some(path) = url.strip_prefix("json://") {
            return non_empty(url, path).map(StoreLocation::Json);
        }
        if url.contains("://") {
            return Err(StoreError::UnsupportedUrl(url.to_string()));
        }
        let path = PathBuf::from(url);
        let is_db = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "db" | "sqlite" | "sqlite3"));
        if is_db {
            Ok(StoreLocation::Sqlite(path))
        } else {
            non_empty(url, url).map(StoreLocation::Json)
        }
    }
}

fn non_empty(url: &str, path: &str) -> Result<PathBuf, StoreError> {
    if path.is_empty() {
        Err(StoreError::UnsupportedUrl(url.to_string()))
    } else {
        Ok(PathBuf::from(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]);
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.store_location().unwrap(), StoreLocation::Json(PathBuf::from("data")));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[(STORE_URL_VAR, "  "), (LOG_VAR, "")]);
        assert_eq!(cfg.store_url, "json://data");
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn schemes_pick_the_backend() {
        let loc = |url: &str| config(&[(STORE_URL_VAR, url)]).store_location();
        assert_eq!(loc("sqlite:///var/lib/plans.db").unwrap(), StoreLocation::Sqlite(PathBuf::from("/var/lib/plans.db")));
        assert_eq!(loc("file://plans.db").unwrap(), StoreLocation::Sqlite(PathBuf::from("plans.db")));
        assert_eq!(loc("json://store").unwrap(), StoreLocation::Json(PathBuf::from("store")));
        assert_eq!(loc("local/plans.sqlite").unwrap(), StoreLocation::Sqlite(PathBuf::from("local/plans.sqlite")));
        assert_eq!(loc("local/dir").unwrap(), StoreLocation::Json(PathBuf::from("local/dir")));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let cfg = config(&[(STORE_URL_VAR, "postgres://user@host/db")]);
        assert!(matches!(cfg.store_location(), Err(StoreError::UnsupportedUrl(_))));
        let cfg = config(&[(STORE_URL_VAR, "sqlite://")]);
        assert!(matches!(cfg.store_location(), Err(StoreError::UnsupportedUrl(_))));
    }
}
