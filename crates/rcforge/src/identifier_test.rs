// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
fn test_parse_global_common() {
    let id = ScriptIdentifier::parse_name("050_global_common_path.sh", "/rc/050_global_common_path.sh")
        .expect("Should parse");
    assert_eq!(id.sequence, 50);
    assert_eq!(id.scope, Scope::Global);
    assert_eq!(id.environment, Environment::Common);
    assert_eq!(id.description, "path");
    assert_eq!(id.path, PathBuf::from("/rc/050_global_common_path.sh"));
}

#[rstest]
fn test_parse_hostname_scope() {
    let id = ScriptIdentifier::from_path("/rc/210_build-box.lan_zsh_prompt-theme.sh")
        .expect("Should parse");
    assert_eq!(id.sequence, 210);
    assert_eq!(id.scope, Scope::Hostname("build-box.lan".to_string()));
    assert_eq!(id.environment, Environment::Zsh);
    assert_eq!(id.description, "prompt-theme");
}

#[rstest]
#[case("000_global_common_first.sh")]
#[case("050_global_bash_config.sh")]
#[case("100_laptop_common_x.sh")]
#[case("999_my-host.example.com_zsh_Last-One2.sh")]
fn test_round_trip(#[case] name: &str) {
    let id = ScriptIdentifier::parse_name(name, name).expect("Should parse");
    assert_eq!(id.file_name(), name);
    assert_eq!(id.to_string(), name);
}

#[rstest]
#[case("50_global_common_path.sh", "three digits")]
#[case("0500_global_common_path.sh", "three digits")]
#[case("abc_global_common_path.sh", "three digits")]
#[case("050_global_fish_path.sh", "unknown environment 'fish'")]
#[case("050_global_common_path.bash", ".sh extension")]
#[case("050_global_common.sh", "4 '_'-separated fields")]
#[case("050_global_common_my_path.sh", "description 'my_path'")]
#[case("050_global_common_.sh", "description ''")]
#[case("050_my host_common_x.sh", "not a valid hostname")]
fn test_parse_rejects(#[case] name: &str, #[case] reason_fragment: &str) {
    match ScriptIdentifier::parse_name(name, name) {
        Err(crate::Error::InvalidScriptName { name: got, reason }) => {
            assert_eq!(got, name);
            assert!(
                reason.contains(reason_fragment),
                "reason {reason:?} should mention {reason_fragment:?}"
            );
        }
        other => panic!("Expected InvalidScriptName, got: {:?}", other),
    }
}

#[rstest]
fn test_ordering_by_sequence_then_name() {
    let mut ids: Vec<ScriptIdentifier> = [
        "/rc/300_global_common_c.sh",
        "/rc/050_global_common_path.sh",
        "/rc/050_global_bash_config.sh",
        "/rc/010_global_zsh_a.sh",
    ]
    .iter()
    .map(|p| ScriptIdentifier::from_path(p).unwrap())
    .collect();
    ids.sort();

    let names: Vec<String> = ids.iter().map(|id| id.file_name()).collect();
    assert_eq!(
        names,
        vec![
            "010_global_zsh_a.sh",
            "050_global_bash_config.sh",
            "050_global_common_path.sh",
            "300_global_common_c.sh",
        ]
    );
}

#[rstest]
fn test_environment_from_shell() {
    assert_eq!(Environment::from(Shell::Bash), Environment::Bash);
    assert_eq!(Environment::from(Shell::Zsh).as_str(), "zsh");
}
