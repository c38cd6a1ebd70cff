//! Malformed configuration must stop the load instead of falling back.

use std::ffi::OsString;
use std::fs;

use rstest::rstest;
use tempfile::TempDir;

use ortho_config::OrthoConfig;
use rig_config::Config;

fn load_with_file(contents: &str) -> Result<Config, String> {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("rig.toml");
    fs::write(&path, contents).expect("write config");
    let args = vec![
        OsString::from("rig"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];
    Config::load_from_iter(args).map_err(|error| error.to_string())
}

#[rstest]
#[case::syntax_error("container_prefix = \"unterminated\n")]
#[case::zero_instance("instance = 0\n")]
#[case::unknown_log_format("log_format = \"pretty\"\n")]
#[case::negative_timeout("runtime_timeout_secs = -5\n")]
fn malformed_configuration_is_rejected(#[case] contents: &str) {
    let error = load_with_file(contents).expect_err("loading must fail");
    assert!(!error.is_empty(), "error message should describe the failure");
}

#[test]
fn well_formed_file_is_applied() {
    let config = load_with_file("container_prefix = \"lab\"\ninstance = 3\nlog_format = \"json\"\n")
        .expect("configuration loads");
    assert_eq!(config.container_prefix(), "lab");
    assert_eq!(config.instance().get(), 3);
    assert_eq!(config.log_format(), rig_config::LogFormat::Json);
}
