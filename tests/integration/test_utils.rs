//! Shared test utilities for integration tests
//!
//! Serializes every test that touches process environment variables and restores
//! them afterwards.

use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with XDG_CONFIG_HOME and HOME pointed into `test_dir` and the given
/// extra variables set (`None` removes a variable). Everything is restored after.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let config_home = test_dir.path().join("xdg");
    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&config_home).unwrap();
    std::fs::create_dir_all(&home).unwrap();

    let mut touched: Vec<(&str, Option<String>)> = vec![
        ("XDG_CONFIG_HOME", std::env::var("XDG_CONFIG_HOME").ok()),
        ("HOME", std::env::var("HOME").ok()),
    ];
    std::env::set_var("XDG_CONFIG_HOME", &config_home);
    std::env::set_var("HOME", &home);
    for (key, value) in vars {
        touched.push((*key, std::env::var(key).ok()));
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }

    let result = f();

    for (key, original) in touched.into_iter().rev() {
        match original {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
    }
    result
}
