use alert_config::config::{ConfigError, ConfigLoader, LogFormat, StorageBackend};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const MANAGED_VARS: &[&str] = &[
    "ALERT_CONFIG_PROFILE",
    "ALERT_CONFIG_API_BIND_ADDR",
    "ALERT_CONFIG_LOG_LEVEL",
    "ALERT_CONFIG_LOG_FORMAT",
    "ALERT_CONFIG_STORAGE_BACKEND",
    "ALERT_CONFIG_STORAGE_FILE_PATH",
    "ALERT_CONFIG_DATABASE_URL",
    "ALERT_CONFIG_DEFAULT_USER_ID",
    "ALERT_CONFIG_ENTITY_GRAPH_PATH",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in MANAGED_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_for(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader_for(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.log_format, LogFormat::Json);
    assert_eq!(cfg.storage_backend, StorageBackend::File);
    assert_eq!(cfg.default_user_id, "system");
    assert!(cfg.entity_graph_path.is_none());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "ALERT_CONFIG_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "ALERT_CONFIG_API_BIND_ADDR=192.168.0.10:5000\nALERT_CONFIG_STORAGE_BACKEND=memory\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "ALERT_CONFIG_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "ALERT_CONFIG_PROFILE=test\nALERT_CONFIG_API_BIND_ADDR=127.0.0.1:4000\n",
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.storage_backend, StorageBackend::Memory);
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "ALERT_CONFIG_API_BIND_ADDR=127.0.0.1:3000\nALERT_CONFIG_DEFAULT_USER_ID=from-file\n",
    );

    unsafe {
        env::set_var("ALERT_CONFIG_API_BIND_ADDR", "0.0.0.0:9090");
        env::set_var("ALERT_CONFIG_LOG_FORMAT", "pretty");
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.log_format, LogFormat::Pretty);
    assert_eq!(cfg.default_user_id, "from-file");

    clear_env();
}

#[test]
fn unprefixed_variables_are_ignored() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "API_BIND_ADDR=not-an-address\n");

    let cfg = loader_for(&temp_dir).load().expect("unprefixed keys ignored");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
}

#[test]
fn storage_paths_are_read() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "ALERT_CONFIG_STORAGE_FILE_PATH=/var/lib/alerts/configs.json\nALERT_CONFIG_ENTITY_GRAPH_PATH=/etc/alerts/graph.json\n",
    );

    let cfg = loader_for(&temp_dir).load().unwrap();
    assert_eq!(
        cfg.storage_file_path,
        PathBuf::from("/var/lib/alerts/configs.json")
    );
    assert_eq!(
        cfg.entity_graph_path,
        Some(PathBuf::from("/etc/alerts/graph.json"))
    );
}

#[test]
fn invalid_bind_addr_returns_error() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    unsafe {
        env::set_var("ALERT_CONFIG_API_BIND_ADDR", "not-an-address");
    }

    let result = loader_for(&temp_dir).load();
    assert!(matches!(result, Err(ConfigError::InvalidBindAddr { .. })));

    clear_env();
}

#[test]
fn invalid_storage_backend_returns_error() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "ALERT_CONFIG_STORAGE_BACKEND=s3\n");

    let result = loader_for(&temp_dir).load();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidStorageBackend { .. })
    ));
}
