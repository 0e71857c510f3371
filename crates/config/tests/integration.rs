//! Integration tests for configuration loading

use cmeval_config::Config;
use std::io::Write;

#[test]
fn load_full_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[eval]
config_name = "Release"
json_events = true

[limits]
max_genex_depth = 16
max_target_property_depth = 8
max_include_depth = 32

[security]
extra_allowed_roots = ["/opt/toolchains"]
"#
    )
    .unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.eval.config_name, "Release");
    assert!(config.eval.json_events);
    assert_eq!(config.limits.max_genex_depth, 16);
    assert_eq!(config.limits.max_target_property_depth, 8);
    assert_eq!(
        config.security.extra_allowed_roots,
        vec![std::path::PathBuf::from("/opt/toolchains")]
    );
}

#[test]
fn partial_config_falls_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[limits]\nmax_genex_depth = 4\n").unwrap();

    let config = Config::load_from_file(file.path()).unwrap();
    assert_eq!(config.limits.max_genex_depth, 4);
    assert_eq!(config.limits.max_include_depth, 64);
    assert_eq!(config.eval.config_name, "Debug");
}

#[test]
fn zero_limit_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[limits]\nmax_genex_depth = 0\n").unwrap();
    assert!(Config::load_from_file(file.path()).is_err());
}

#[test]
fn missing_file_is_error() {
    assert!(Config::load_from_file(std::path::Path::new("/nonexistent/cmeval.toml")).is_err());
}
