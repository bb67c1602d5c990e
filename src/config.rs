use crate::errors::{DashboardError, DashboardResult};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(DashboardError::Config(format!("STORAGE_BACKEND: unknown backend '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub seed_on_start: bool,
    pub cors_origin: Option<String>,
    pub regen_months: u32,
    pub regen_base_total: i64,
    pub regen_seed: Option<u64>,
    pub regen_strict: bool,
}

impl AppConfig {
    pub fn from_env() -> DashboardResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> DashboardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let server_port = var_or("SERVER_PORT", "5000")
            .parse::<u16>()
            .map_err(|e| DashboardError::Config(format!("SERVER_PORT: {e}")))?;

        let storage_backend = var_or("STORAGE_BACKEND", "sqlite").parse::<StorageBackend>()?;

        let seed_on_start = parse_bool("SEED_ON_START", &var_or("SEED_ON_START", "true"))?;

        let regen_months = var_or("REGEN_MONTHS", "30")
            .parse::<u32>()
            .map_err(|e| DashboardError::Config(format!("REGEN_MONTHS: {e}")))?;
        if regen_months == 0 {
            return Err(DashboardError::Config("REGEN_MONTHS: must be at least 1".into()));
        }

        let regen_base_total = var_or("REGEN_BASE_TOTAL", "8000")
            .parse::<i64>()
            .map_err(|e| DashboardError::Config(format!("REGEN_BASE_TOTAL: {e}")))?;
        if regen_base_total < 0 {
            return Err(DashboardError::Config("REGEN_BASE_TOTAL: must not be negative".into()));
        }

        let regen_seed = lookup("REGEN_SEED")
            .map(|s| {
                s.parse::<u64>()
                    .map_err(|e| DashboardError::Config(format!("REGEN_SEED: {e}")))
            })
            .transpose()?;

        let regen_strict = parse_bool("REGEN_STRICT", &var_or("REGEN_STRICT", "false"))?;

        Ok(Self {
            server_port,
            storage_backend,
            data_dir: PathBuf::from(var_or("DATA_DIR", "data")),
            seed_on_start,
            cors_origin: lookup("CORS_ORIGIN").filter(|s| !s.is_empty()),
            regen_months,
            regen_base_total,
            regen_seed,
            regen_strict,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> DashboardResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DashboardError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DashboardResult<AppConfig> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.server_port, 5000);
        assert_eq!(cfg.storage_backend, StorageBackend::Sqlite);
        assert!(cfg.seed_on_start);
        assert_eq!(cfg.regen_months, 30);
        assert_eq!(cfg.regen_base_total, 8000);
        assert_eq!(cfg.regen_seed, None);
        assert!(!cfg.regen_strict);
        assert!(cfg.cors_origin.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config_from(&[
            ("SERVER_PORT", "8080"),
            ("STORAGE_BACKEND", "Memory"),
            ("SEED_ON_START", "no"),
            ("REGEN_MONTHS", "24"),
            ("REGEN_SEED", "42"),
            ("REGEN_STRICT", "1"),
            ("CORS_ORIGIN", "http://localhost:4200"),
        ])
        .unwrap();
        assert_eq!(cfg.server_port, 8080);
        assert_eq!(cfg.storage_backend, StorageBackend::Memory);
        assert!(!cfg.seed_on_start);
        assert_eq!(cfg.regen_months, 24);
        assert_eq!(cfg.regen_seed, Some(42));
        assert!(cfg.regen_strict);
        assert_eq!(cfg.cors_origin.as_deref(), Some("http://localhost:4200"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(config_from(&[("SERVER_PORT", "http")]), Err(DashboardError::Config(_))));
        assert!(matches!(config_from(&[("STORAGE_BACKEND", "postgres")]), Err(DashboardError::Config(_))));
        assert!(matches!(config_from(&[("REGEN_MONTHS", "0")]), Err(DashboardError::Config(_))));
        assert!(matches!(config_from(&[("SEED_ON_START", "maybe")]), Err(DashboardError::Config(_))));
    }
}
