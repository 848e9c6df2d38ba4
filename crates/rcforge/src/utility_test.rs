// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn write(path: PathBuf, content: &str) -> PathBuf {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

#[rstest]
#[case("#!/bin/bash\n# RC Summary: Shows headers\necho\n", Some("Shows headers"))]
#[case("#!/usr/bin/env python3\n# hello.py\n#   RC Summary: Greets  \n", None)]
#[case("#!/bin/bash\n# RC Summary:\n", None)]
#[case("#!/bin/bash\necho hi\n", None)]
fn test_read_summary(#[case] content: &str, #[case] expected: Option<&str>) {
    let tmp = TempDir::new().unwrap();
    let path = write(tmp.path().join("tool.sh"), content);
    assert_eq!(read_summary(&path).as_deref(), expected);
}

#[rstest]
fn test_read_summary_indented_and_late() {
    let tmp = TempDir::new().unwrap();
    let indented = write(tmp.path().join("a.sh"), "  # RC Summary: Indented\n");
    assert_eq!(read_summary(&indented).as_deref(), Some("Indented"));

    let late = format!("{}# RC Summary: Too late\n", "#\n".repeat(20));
    let late = write(tmp.path().join("b.sh"), &late);
    assert_eq!(read_summary(&late), None);

    assert_eq!(read_summary(tmp.path().join("missing.sh")), None);
}

#[rstest]
fn test_list_and_find_utilities() {
    let tmp = TempDir::new().unwrap();
    let user = tmp.path().join("user");
    let system = tmp.path().join("system");
    write(system.join("utils/diag.sh"), "# RC Summary: System diagnostics\n");
    write(user.join("utils/diag.sh"), "# RC Summary: My diagnostics\n");
    write(system.join("utils/httpheaders.sh"), "#!/bin/bash\n");
    let resolver = IncludeResolver::new(&user, &system);

    let utils = UtilityInfo::list(&resolver).unwrap();
    let names: Vec<&str> = utils.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["diag", "httpheaders"]);
    assert_eq!(utils[0].summary.as_deref(), Some("My diagnostics"));
    assert!(utils[0].overrides);
    assert_eq!(utils[1].summary, None);

    let diag = UtilityInfo::find(&resolver, "diag").unwrap();
    assert_eq!(diag.layer, Layer::User);
    assert_eq!(diag.canonical_path(), dunce::canonicalize(user.join("utils/diag.sh")).unwrap());

    assert!(matches!(
        UtilityInfo::find(&resolver, "absent"),
        Err(crate::Error::ResolutionFailed { .. })
    ));
}

#[rstest]
fn test_command_uses_shell_for_scripts() {
    let info = UtilityInfo {
        name: "diag".into(),
        path: PathBuf::from("/x/utils/diag.sh"),
        layer: Layer::System,
        overrides: false,
        summary: None,
    };
    let cmd = info.command(Shell::Zsh, ["-v", "host"]);
    assert_eq!(cmd.get_program(), "zsh");
    let args: Vec<_> = cmd.get_args().collect();
    assert_eq!(args, vec!["/x/utils/diag.sh", "-v", "host"]);

    let py = UtilityInfo {
        path: PathBuf::from("/x/utils/hello.py"),
        ..info
    };
    let cmd = py.command(Shell::Bash, ["bob"]);
    assert_eq!(cmd.get_program(), "/x/utils/hello.py");
    assert_eq!(cmd.get_args().collect::<Vec<_>>(), vec!["bob"]);
}
