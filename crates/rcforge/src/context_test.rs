// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn id(name: &str) -> ScriptIdentifier {
    ScriptIdentifier::parse_name(name, format!("/rc/{name}")).unwrap()
}

#[rstest]
#[case("050_global_common_path.sh", Shell::Bash, "laptop", true)]
#[case("050_global_common_path.sh", Shell::Zsh, "desktop", true)]
#[case("050_global_bash_config.sh", Shell::Bash, "laptop", true)]
#[case("050_global_bash_config.sh", Shell::Zsh, "laptop", false)]
#[case("100_laptop_common_x.sh", Shell::Zsh, "laptop", true)]
#[case("100_laptop_common_x.sh", Shell::Zsh, "desktop", false)]
#[case("100_laptop_zsh_x.sh", Shell::Bash, "laptop", false)]
#[case("100_Laptop_common_x.sh", Shell::Bash, "laptop", false)]
fn test_applies(
    #[case] name: &str,
    #[case] shell: Shell,
    #[case] host: &str,
    #[case] expected: bool,
) {
    let ctx = LoadContext::new(shell, host);
    assert_eq!(ctx.applies(&id(name)), expected);
}

#[rstest]
fn test_applies_is_deterministic() {
    let ctx = LoadContext::new(Shell::Bash, "laptop");
    let script = id("100_laptop_bash_x.sh");
    let first = ctx.applies(&script);
    for _ in 0..10 {
        assert_eq!(ctx.applies(&script), first);
    }
    // evaluating other scripts in between does not change the answer
    let _ = ctx.applies(&id("100_desktop_zsh_y.sh"));
    assert_eq!(ctx.applies(&script), first);
}

#[rstest]
fn test_filter_keeps_input_order() {
    let ids = vec![
        id("200_global_zsh_b.sh"),
        id("100_global_common_a.sh"),
        id("150_desktop_common_c.sh"),
        id("050_global_bash_d.sh"),
    ];
    let ctx = LoadContext::new(Shell::Bash, "laptop");
    let kept: Vec<String> = ctx.filter(&ids).iter().map(|i| i.file_name()).collect();
    assert_eq!(kept, vec!["100_global_common_a.sh", "050_global_bash_d.sh"]);
}

#[rstest]
#[case("laptop.example.com", "laptop")]
#[case("laptop", "laptop")]
fn test_short_hostname(#[case] full: &str, #[case] expected: &str) {
    assert_eq!(short_hostname(full), expected);
}

#[rstest]
fn test_display() {
    assert_eq!(LoadContext::new(Shell::Zsh, "desktop").to_string(), "zsh@desktop");
}
