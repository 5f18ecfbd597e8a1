//! The configuration files shipped in `config/` load and validate in every
//! environment.

use changeflow_core::config::ConfigManager;
use changeflow_core::models::TenantRegistry;
use std::io::Write;
use std::path::PathBuf;

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/changeflow.toml")
}

#[test]
fn test_shipped_config_loads_for_development() {
    let manager = ConfigManager::load_from_path_with_env(&shipped_config(), "development").unwrap();
    let config = manager.config();

    assert_eq!(config.engine.identities.len(), 1);
    assert_eq!(config.engine.system_actor, "system:reconciler");
    assert!(!config.feedback.enabled);

    let registry = TenantRegistry::from_config(&config.tenants);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.resolve("acme").unwrap().queue_name, "acme-changes");
    assert!(registry.resolve("initech").is_err());
}

#[test]
fn test_test_overlay_speeds_up_polling() {
    let manager = ConfigManager::load_from_path_with_env(&shipped_config(), "test").unwrap();
    let config = manager.config();

    assert_eq!(config.queue.poll_interval_ms, 10);
    assert_eq!(config.backoff.initial_delay_ms, 10);
    assert!(config.feedback.enabled);
    // Untouched sections still come from the base file
    assert_eq!(config.storage.trigger_prefix, "customers");
}

#[test]
fn test_production_overlay_dead_letters_fatal_failures() {
    let manager = ConfigManager::load_from_path_with_env(&shipped_config(), "production").unwrap();
    let config = manager.config();

    assert!(config.queue.dead_letter_fatal_immediately);
    assert_eq!(config.engine.max_concurrent_reconciliations, 8);
    assert_eq!(manager.environment(), "production");
}

#[test]
fn test_overlay_cannot_break_invariants_silently() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("changeflow.toml");
    std::fs::copy(shipped_config(), &base).unwrap();
    let mut overlay = std::fs::File::create(dir.path().join("changeflow.staging.toml")).unwrap();
    overlay
        .write_all(b"[storage]\ntrigger_prefix = \"archive\"\n")
        .unwrap();

    let err = ConfigManager::load_from_path_with_env(&base, "staging").unwrap_err();
    assert!(err.to_string().contains("trigger_prefix"), "{err}");
}
