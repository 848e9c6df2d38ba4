// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

#[rstest]
fn test_compute_digest_known_value() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "empty.sh", "");
    assert_eq!(
        compute_digest(&file).unwrap(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

#[rstest]
fn test_first_verification_initializes_then_unchanged() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "system/lib/core.sh", "echo core\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();

    assert!(store.get(&file).is_none());
    assert_eq!(store.verify_or_initialize(&file).unwrap(), Verification::Initialized);
    assert!(store.get(&file).is_some());
    assert_eq!(store.verify_or_initialize(&file).unwrap(), Verification::Unchanged);
    assert_eq!(store.verify_or_initialize(&file).unwrap(), Verification::Unchanged);
}

#[rstest]
fn test_mismatch_is_not_auto_resolved() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo one\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();
    store.verify_or_initialize(&file).unwrap();
    let original = store.get(&file).unwrap().digest.clone();

    std::fs::write(&file, "echo two\n").unwrap();
    let first = store.verify_or_initialize(&file).unwrap();
    let second = store.verify_or_initialize(&file).unwrap();

    match &first {
        Verification::Mismatch { old, new } => {
            assert_eq!(old, &original);
            assert_ne!(new, &original);
        }
        other => panic!("Expected Mismatch, got: {:?}", other),
    }
    assert_eq!(first, second);
    assert!(first.is_outstanding());
    assert_eq!(store.get(&file).unwrap().digest, original);
}

#[rstest]
fn test_acknowledge_accepts_new_contents() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo one\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();
    store.verify_or_initialize(&file).unwrap();

    std::fs::write(&file, "echo two\n").unwrap();
    let digest = store.acknowledge(&file).unwrap();
    assert_eq!(digest, Some(compute_digest(&file).unwrap()));
    assert_eq!(store.verify_or_initialize(&file).unwrap(), Verification::Unchanged);
}

#[rstest]
fn test_acknowledge_untracked_file() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo one\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();
    assert!(matches!(store.acknowledge(&file), Err(crate::Error::NotTracked(_))));
}

#[rstest]
fn test_missing_file_reported_and_dropped_on_ack() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo one\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();
    store.verify_or_initialize(&file).unwrap();
    std::fs::remove_file(&file).unwrap();

    let results = store.verify_all(&[]).unwrap();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].1, Verification::Missing { .. }));

    assert_eq!(store.acknowledge(&file).unwrap(), None);
    assert!(store.records.is_empty());
}

#[rstest]
fn test_user_scripts_are_never_tracked() {
    let tmp = TempDir::new().unwrap();
    let scripts = tmp.path().join("rc-scripts");
    let file = write(&scripts, "050_global_common_path.sh", "export A=1\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml"))
        .unwrap()
        .exclude(&scripts);

    assert!(matches!(
        store.verify_or_initialize(&file),
        Err(crate::Error::UntrackedUserScript(_))
    ));
    assert!(store.records.is_empty());
}

#[rstest]
fn test_save_and_reopen_with_backup() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo one\n");
    let location = tmp.path().join("state/checksums.yaml");

    let mut store = ChecksumStore::open(&location).unwrap();
    store.verify_or_initialize(&file).unwrap();
    store.save().unwrap();
    assert!(!tmp.path().join("state/checksums.yaml.bak").exists());

    let mut reopened = ChecksumStore::open(&location).unwrap();
    assert_eq!(reopened.records, store.records);
    assert_eq!(reopened.verify_or_initialize(&file).unwrap(), Verification::Unchanged);
    reopened.save().unwrap();
    assert!(tmp.path().join("state/checksums.yaml.bak").exists());

    let yaml = std::fs::read_to_string(&location).unwrap();
    assert!(yaml.contains("api: rcforge/v0/checksums"));
}

#[rstest]
fn test_open_invalid_store() {
    let tmp = TempDir::new().unwrap();
    let location = write(tmp.path(), "checksums.yaml", "api: [unclosed\n");
    assert!(matches!(
        ChecksumStore::open(&location),
        Err(crate::Error::InvalidYaml { .. })
    ));
}

#[rstest]
fn test_managed_files_skips_excluded() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("system");
    write(&root, "lib/core.sh", "");
    write(&root, "utils/diag.sh", "");
    write(&root, "rc-scripts/050_global_common_path.sh", "");

    let files = managed_files(&root, &[root.join("rc-scripts")]).unwrap();
    assert_eq!(files, vec![root.join("lib/core.sh"), root.join("utils/diag.sh")]);

    assert!(managed_files(tmp.path().join("absent"), &[]).unwrap().is_empty());
}

#[rstest]
fn test_verify_all_continues_past_untrackable_file() {
    let tmp = TempDir::new().unwrap();
    let scripts = tmp.path().join("rc-scripts");
    let user_script = write(&scripts, "050_global_common_path.sh", "");
    let system = write(tmp.path(), "system/lib/core.sh", "echo core\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml"))
        .unwrap()
        .exclude(&scripts);

    let results = store.verify_all(&[user_script.clone(), system.clone()]).unwrap();
    assert_eq!(results, vec![(system, Verification::Initialized)]);
    assert!(store.get(&user_script).is_none());
}

#[rstest]
fn test_outstanding_after_partial_ack() {
    let tmp = TempDir::new().unwrap();
    let one = write(tmp.path(), "one.sh", "echo one\n");
    let two = write(tmp.path(), "two.sh", "echo two\n");
    let mut store = ChecksumStore::open(tmp.path().join("checksums.yaml")).unwrap();
    store.verify_all(&[one.clone(), two.clone()]).unwrap();
    assert!(store.outstanding().is_empty());

    std::fs::write(&one, "echo changed\n").unwrap();
    std::fs::remove_file(&two).unwrap();
    assert_eq!(store.outstanding().len(), 2);

    store.acknowledge(&one).unwrap();
    let pending = store.outstanding();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].0, two);
    assert!(matches!(pending[0].1, Verification::Missing { .. }));
}

#[rstest]
fn test_forget_removes_record() {
    let tmp = TempDir::new().unwrap();
    let file = write(tmp.path(), "core.sh", "echo core\n");
    let location = tmp.path().join("checksums.yaml");
    let mut store = ChecksumStore::open(&location).unwrap();
    store.verify_or_initialize(&file).unwrap();
    let digest = store.get(&file).unwrap().digest.clone();

    let removed = store.forget(&file).unwrap();
    assert_eq!(removed.digest, digest);
    assert!(store.get(&file).is_none());
    store.save().unwrap();
    assert!(ChecksumStore::open(&location).unwrap().records.is_empty());

    let err = store.forget(&file).unwrap_err();
    assert!(matches!(err, crate::Error::NotTracked(_)));
}
