// Tests for environment-driven configuration
// Env vars are process-global, so every test runs serially

use rainfall_register::config::{Config, ConfigError};
use rainfall_register::register::{Rainfall, Tolerance, ValueNormalizer};
use serial_test::serial;
use std::env;

const VARS: [&str; 6] = [
    "SERVER_HOST",
    "SERVER_PORT",
    "TOTALS_TOL_ABS",
    "TOTALS_TOL_REL",
    "ZERO_AS_MISSING",
    "CLEAN_WORKER_CONCURRENCY",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.server_addr(), "0.0.0.0:8080");
    assert_eq!(config.totals_tolerance, Tolerance::default());
    assert!(config.zero_as_missing);
    assert_eq!(config.clean_worker_concurrency, 4);
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    env::set_var("SERVER_HOST", "127.0.0.1");
    env::set_var("SERVER_PORT", "9090");
    env::set_var("TOTALS_TOL_ABS", "0.25");
    env::set_var("TOTALS_TOL_REL", "0.1");
    env::set_var("ZERO_AS_MISSING", "false");
    env::set_var("CLEAN_WORKER_CONCURRENCY", "0");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.server_addr(), "127.0.0.1:9090");
    assert_eq!(config.totals_tolerance.abs(), 0.25);
    assert_eq!(config.totals_tolerance.rel(), 0.1);
    assert!(!config.zero_as_missing);
    assert_eq!(config.clean_worker_concurrency, 1);

    let normalizer = ValueNormalizer::new(config.register_tables().ocr);
    assert_eq!(normalizer.normalize(Some("0.00")), Rainfall::Value(0.0));
}

#[test]
#[serial]
fn test_unparseable_values_fall_back_to_defaults() {
    clear_env();
    env::set_var("SERVER_PORT", "not-a-port");
    env::set_var("TOTALS_TOL_ABS", "abc");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.server_port, 8080);
    assert_eq!(config.totals_tolerance.abs(), Tolerance::DEFAULT_ABS);
}

#[test]
#[serial]
fn test_negative_tolerance_is_rejected() {
    clear_env();
    env::set_var("TOTALS_TOL_REL", "-0.2");

    let result = Config::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::Tolerance(_))));
}
