use apod_cache::config::{Config, Overrides};
use figment::providers::Serialized;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let figment = figment::Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
cache_dir = "/srv/apod/images"
set_wallpaper = false
api_url = "https://example.invalid/apod"
"#;
    fs::write(&config_path, toml_content).unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.cache_dir, Some(PathBuf::from("/srv/apod/images")));
    assert!(!config.set_wallpaper);
    assert_eq!(config.api_url, "https://example.invalid/apod");
}

#[test]
fn test_config_missing_file_uses_defaults() {
    let temp_dir = tempdir().unwrap();
    let config = Config::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config.api_url, Config::default().api_url);
    assert!(config.set_wallpaper);
}

#[test]
fn test_config_invalid_toml_is_error() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "set_wallpaper = \"sometimes\"").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_env_overrides_file_and_cli_overrides_env() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "timeout_secs = 10\napi_key = \"from-file\"\n").unwrap();

    std::env::set_var("APOD_TIMEOUT_SECS", "5");
    std::env::set_var("APOD_API_KEY", "from-env");

    let loaded = Config::load(Some(&config_path));

    std::env::remove_var("APOD_TIMEOUT_SECS");
    std::env::remove_var("APOD_API_KEY");

    let config = loaded.unwrap();
    assert_eq!(config.timeout_secs, 5);
    assert_eq!(config.api_key, "from-env");

    let config = config.apply_overrides(Overrides {
        api_key: Some("from-cli".into()),
        ..Overrides::default()
    });
    assert_eq!(config.api_key, "from-cli");
    assert_eq!(config.timeout_secs, 5);
}
