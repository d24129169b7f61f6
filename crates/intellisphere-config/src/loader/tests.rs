use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Project at `<tmp>/project` with a `.git` marker and cwd in `project/app`.
fn project_layout(temp: &TempDir) -> (PathBuf, PathBuf) {
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("app");
    fs::create_dir_all(&cwd).expect("cwd");
    (project_root, cwd)
}

fn isolated_options(cwd: &Path) -> LayeredConfigOptions {
    let mut options = LayeredConfigOptions::new(cwd);
    options.system_config_path = None;
    options.user_config_path = None;
    options.requirements_path = None;
    options
}

#[test]
fn empty_config_uses_defaults() {
    let config = IntelliSphereConfig::load_from_str("{}").expect("config");
    assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.client.domain, None);
}

#[test]
fn rejects_unknown_keys_with_path() {
    let err = IntelliSphereConfig::load_from_str("{ server: { port: 1 } }").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("server.port"), "{msg}");
    assert!(msg.contains("unknown key"), "{msg}");

    let err = IntelliSphereConfig::load_from_str("{ agents: {} }").unwrap_err();
    assert!(err.to_string().contains("config:agents"));
}

#[test]
fn rejects_mistyped_values() {
    let err = IntelliSphereConfig::load_from_str("{ server: { timeout_secs: \"10\" } }")
        .unwrap_err();
    assert!(err.to_string().contains("server.timeout_secs"));
}

#[test]
fn rejects_non_http_base_url() {
    let err = IntelliSphereConfig::load_from_str("{ server: { base_url: \"ftp://host\" } }")
        .unwrap_err();
    assert!(err.to_string().contains("server.base_url"));
}

#[test]
fn rejects_unknown_log_level() {
    let err =
        IntelliSphereConfig::load_from_str("{ logging: { level: \"loud\" } }").unwrap_err();
    assert!(err.to_string().contains("logging.level"));
}

#[test]
fn cwd_layer_overrides_project_and_user() {
    let temp = TempDir::new().expect("tmp");
    let (project_root, cwd) = project_layout(&temp);

    let user_config = temp.path().join("user.json5");
    write_json5(
        &user_config,
        "{ client: { domain: \"health\" }, server: { timeout_secs: 30 } }",
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ client: { domain: \"law\" } }",
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ client: { domain: \"finance\" } }",
    );

    let mut options = isolated_options(&cwd);
    options.user_config_path = Some(user_config);
    let layered = IntelliSphereConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.client.domain.as_deref(), Some("finance"));
    assert_eq!(layered.config.server.timeout_secs, 30);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd
        ]
    );
}

#[test]
fn project_root_equal_to_cwd_is_read_once() {
    let temp = TempDir::new().expect("tmp");
    let (project_root, _) = project_layout(&temp);
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        "{ client: { domain: \"research\" } }",
    );

    let layered = IntelliSphereConfig::load_layered_with_options(isolated_options(&project_root))
        .expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
}

#[test]
fn requirements_pin_values_against_runtime() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project_layout(&temp);

    let requirements = temp.path().join("requirements.json5");
    write_json5(
        &requirements,
        "{ server: { base_url: \"https://chat.internal\" } }",
    );
    let runtime = temp.path().join("runtime.json5");
    write_json5(
        &runtime,
        "{ server: { base_url: \"http://localhost:9999\", timeout_secs: 5 } }",
    );

    let mut options = isolated_options(&cwd).with_runtime_path(&runtime);
    options.requirements_path = Some(requirements);
    let layered = IntelliSphereConfig::load_layered_with_options(options).expect("layered");

    assert_eq!(layered.config.server.base_url, "https://chat.internal");
    assert_eq!(layered.config.server.timeout_secs, 5);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Requirements);
}

#[test]
fn runtime_layer_wins_without_requirements() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project_layout(&temp);
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        "{ logging: { level: \"warn\" } }",
    );
    let runtime = temp.path().join("runtime.json5");
    write_json5(&runtime, "{ logging: { level: \"debug\" } }");

    let options = isolated_options(&cwd).with_runtime_path(&runtime);
    let layered = IntelliSphereConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.logging.level, "debug");
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project_layout(&temp);
    let options = isolated_options(&cwd).with_runtime_path(temp.path().join("absent.json5"));
    let err = IntelliSphereConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::MissingLayer(_)));
}

#[test]
fn invalid_layer_names_its_source() {
    let temp = TempDir::new().expect("tmp");
    let (_, cwd) = project_layout(&temp);
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ storage: { dir: \"x\" } }");

    let err = IntelliSphereConfig::load_layered_with_options(isolated_options(&cwd)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("cwd("), "{msg}");
    assert!(msg.contains("storage.dir"), "{msg}");
}
