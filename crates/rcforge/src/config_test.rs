// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

fn user_dir_overrides(dir: &Path) -> ConfigOverrides {
    ConfigOverrides {
        user_dir: Some(dir.to_path_buf()),
        ..Default::default()
    }
}

#[rstest]
fn test_parse_minimal_config() {
    let file = ConfigFile::from_yaml("api: rcforge/v0\n", Path::new("rcforge.yaml"))
        .expect("Should parse minimal config");
    assert_eq!(file.api, ApiVersion::V0);
    assert!(file.system_dir.is_none());
    assert!(file.tracked_files.is_empty());
}

#[rstest]
fn test_parse_invalid_config() {
    let result = ConfigFile::from_yaml("api: rcforge/v0\ntracked_files: [\n", Path::new("x"));
    assert!(matches!(result, Err(crate::Error::InvalidYaml { .. })));

    let wrong_api = ConfigFile::from_yaml("api: other/v9\n", Path::new("x"));
    assert!(wrong_api.is_err());
}

#[rstest]
fn test_defaults_under_user_dir() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_with(
        lookup(&[("RCFORGE_SYSTEM_DIR", "/opt/rcforge")]),
        &user_dir_overrides(tmp.path()),
    )
    .unwrap();

    assert_eq!(config.scripts_dir, tmp.path().join("rc-scripts"));
    assert_eq!(config.checksum_store, tmp.path().join("checksums.yaml"));
    assert_eq!(config.system_dir, PathBuf::from("/opt/rcforge"));
    assert!(config.continue_on_error);
    assert!(!config.timing);
    assert!(config.source_path.is_none());
}

#[rstest]
fn test_file_values_relative_to_user_dir() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join(CONFIG_FILENAME),
        r#"
api: rcforge/v0
system_dir: /usr/share/rcforge
scripts_dir: scripts
checksum_store: state/sums.yaml
continue_on_error: false
timing: true
tracked_files:
  - /etc/bash.bashrc
extra_hosts:
  - build-box
"#,
    )
    .unwrap();

    let config = Config::load_with(lookup(&[]), &user_dir_overrides(tmp.path())).unwrap();
    assert_eq!(config.system_dir, PathBuf::from("/usr/share/rcforge"));
    assert_eq!(config.scripts_dir, tmp.path().join("scripts"));
    assert_eq!(config.checksum_store, tmp.path().join("state/sums.yaml"));
    assert!(!config.continue_on_error);
    assert!(config.timing);
    assert_eq!(config.tracked_files, vec![PathBuf::from("/etc/bash.bashrc")]);
    assert_eq!(config.extra_hosts, vec!["build-box"]);
    assert_eq!(config.source_path, Some(tmp.path().join(CONFIG_FILENAME)));
}

#[rstest]
fn test_precedence_cli_over_env_over_file() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join(CONFIG_FILENAME),
        "api: rcforge/v0\nscripts_dir: /from/file\nsystem_dir: /from/file-system\n",
    )
    .unwrap();

    let env = lookup(&[
        ("RCFORGE_SCRIPTS_DIR", "/from/env"),
        ("RCFORGE_SYSTEM_DIR", "/from/env-system"),
    ]);
    let overrides = ConfigOverrides {
        user_dir: Some(tmp.path().to_path_buf()),
        scripts_dir: Some(PathBuf::from("/from/cli")),
        ..Default::default()
    };
    let config = Config::load_with(env, &overrides).unwrap();
    assert_eq!(config.scripts_dir, PathBuf::from("/from/cli"));
    assert_eq!(config.system_dir, PathBuf::from("/from/env-system"));
}

#[rstest]
fn test_user_dir_from_env() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().display().to_string();
    let config =
        Config::load_with(lookup(&[("RCFORGE_USER_DIR", dir.as_str())]), &ConfigOverrides::default())
            .unwrap();
    assert_eq!(config.user_dir, tmp.path());
}

#[rstest]
#[case(&[("RCFORGE_DEBUG", "1")], None, true)]
#[case(&[("SHELL_DEBUG", "yes")], None, true)]
#[case(&[("RCFORGE_DEBUG", "0")], None, false)]
#[case(&[("RCFORGE_DEBUG", "1")], Some(false), false)]
#[case(&[], Some(true), true)]
fn test_timing_sources(
    #[case] vars: &[(&str, &str)],
    #[case] flag: Option<bool>,
    #[case] expected: bool,
) {
    let tmp = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        user_dir: Some(tmp.path().to_path_buf()),
        timing: flag,
        ..Default::default()
    };
    let config = Config::load_with(lookup(vars), &overrides).unwrap();
    assert_eq!(config.timing, expected);
}

#[rstest]
fn test_managed_files_include_tracked_and_skip_scripts() {
    let tmp = TempDir::new().unwrap();
    let system = tmp.path().join("system");
    std::fs::create_dir_all(system.join("lib")).unwrap();
    std::fs::write(system.join("lib/core.sh"), "").unwrap();
    let bashrc = tmp.path().join("bashrc");
    std::fs::write(&bashrc, "").unwrap();

    let overrides = ConfigOverrides {
        user_dir: Some(tmp.path().join("user")),
        system_dir: Some(system.clone()),
        scripts_dir: Some(system.join("rc-scripts")),
        timing: None,
    };
    std::fs::create_dir_all(system.join("rc-scripts")).unwrap();
    std::fs::write(system.join("rc-scripts/050_global_common_path.sh"), "").unwrap();

    let mut config = Config::load_with(lookup(&[]), &overrides).unwrap();
    config.tracked_files = vec![bashrc.clone(), tmp.path().join("absent")];

    assert_eq!(config.managed_files().unwrap(), vec![system.join("lib/core.sh"), bashrc]);
}

#[rstest]
fn test_tracked_files_under_scripts_dir_are_ignored() {
    let tmp = TempDir::new().unwrap();
    let scripts = tmp.path().join("rc-scripts");
    std::fs::create_dir_all(&scripts).unwrap();
    let user_script = scripts.join("050_global_common_path.sh");
    std::fs::write(&user_script, "").unwrap();
    let bashrc = tmp.path().join("bashrc");
    std::fs::write(&bashrc, "").unwrap();

    let overrides = ConfigOverrides {
        user_dir: Some(tmp.path().to_path_buf()),
        system_dir: Some(tmp.path().join("system")),
        ..Default::default()
    };
    let mut config = Config::load_with(lookup(&[]), &overrides).unwrap();
    config.tracked_files = vec![user_script, bashrc.clone()];

    assert_eq!(config.managed_files().unwrap(), vec![bashrc]);
}

#[rstest]
fn test_relative_dirs_become_absolute() {
    let tmp = TempDir::new().unwrap();
    let overrides = ConfigOverrides {
        user_dir: Some(tmp.path().to_path_buf()),
        system_dir: Some(PathBuf::from("relsys")),
        ..Default::default()
    };
    let config = Config::load_with(lookup(&[("RCFORGE_SCRIPTS_DIR", "relscripts")]), &overrides)
        .unwrap();

    assert!(config.system_dir.is_absolute());
    assert!(config.system_dir.ends_with("relsys"));
    assert!(config.scripts_dir.is_absolute());
    assert!(config.scripts_dir.ends_with("relscripts"));
}

#[rstest]
#[case("~/x", true)]
#[case("/abs", false)]
#[case("rel", false)]
fn test_expand_home(#[case] input: &str, #[case] expands: bool) {
    let path = expand_home(input).unwrap();
    if expands {
        assert_eq!(path, dirs::home_dir().unwrap().join("x"));
    } else {
        assert_eq!(path, PathBuf::from(input));
    }
}
