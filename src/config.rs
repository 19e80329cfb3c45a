use std::env;

use crate::register::{RegisterTables, Tolerance, ToleranceError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid totals tolerance: {0}")]
    Tolerance(#[from] ToleranceError),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub totals_tolerance: Tolerance,
    pub zero_as_missing: bool,
    pub clean_worker_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let tol_abs = env::var("TOTALS_TOL_ABS")
            .unwrap_or_else(|_| Tolerance::DEFAULT_ABS.to_string())
            .parse()
            .unwrap_or(Tolerance::DEFAULT_ABS);
        let tol_rel = env::var("TOTALS_TOL_REL")
            .unwrap_or_else(|_| Tolerance::DEFAULT_REL.to_string())
            .parse()
            .unwrap_or(Tolerance::DEFAULT_REL);

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            totals_tolerance: Tolerance::new(tol_abs, tol_rel)?,
            zero_as_missing: env::var("ZERO_AS_MISSING")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            clean_worker_concurrency: env::var("CLEAN_WORKER_CONCURRENCY")
                .unwrap_or_else(|_| "4".to_string())
                .parse::<usize>()
                .unwrap_or(4)
                .max(1),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Lookup tables with the configured zero policy applied
    pub fn register_tables(&self) -> RegisterTables {
        let tables = RegisterTables::standard();
        if self.zero_as_missing {
            tables
        } else {
            tables.keeping_zero()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            totals_tolerance: Tolerance::default(),
            zero_as_missing: true,
            clean_worker_concurrency: 4,
        }
    }
}
