mod repos;

use repos::{TestRepo, expect_success, plan};

use git_regroup::{extract_hunks, run};

#[test]
fn binary_file_round_trips_through_a_group() {
    let repo = TestRepo::new();
    repo.write_file("readme.txt", "hello\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.write_binary("logo.bin", &[0u8, 1, 2, 255, 254, 40, 41, 0, 7]);
    repo.write_file("readme.txt", "hello world\n");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let (_, hunks) = extract_hunks(&repo.repository(), &base).unwrap();
    let mut ids: Vec<String> = hunks.iter().map(|h| h.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["logo.bin:0-0", "readme.txt:1-1"]);

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[
            ("add logo", &["logo.bin:0-0"]),
            ("greet the world", &["readme.txt:1-1"]),
        ]),
    );
    expect_success(result);

    assert_eq!(repo.commit_count(&format!("{}..HEAD", base)), 2);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
    // The binary lands in the first commit, untouched by the second.
    assert!(
        repo.git(&["ls-tree", "--name-only", "HEAD~1"])
            .unwrap()
            .lines()
            .any(|l| l == "logo.bin")
    );
}

#[test]
fn pure_rename_is_one_metadata_commit() {
    let repo = TestRepo::new();
    repo.write_file("old_name.txt", "content stays identical\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.git(&["mv", "old_name.txt", "new_name.txt"]).unwrap();
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let (_, hunks) = extract_hunks(&repo.repository(), &base).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].id(), "new_name.txt:0-0");

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("rename the file", &["new_name.txt:0-0"])]),
    );
    expect_success(result);

    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
    let names = repo.git(&["ls-tree", "--name-only", "HEAD"]).unwrap();
    assert!(names.lines().any(|l| l == "new_name.txt"));
    assert!(!names.lines().any(|l| l == "old_name.txt"));
}

#[test]
fn file_addition_and_deletion_in_separate_commits() {
    let repo = TestRepo::new();
    repo.write_file("doomed.txt", "bye\n");
    repo.write_file("keep.txt", "kept\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    std::fs::remove_file(repo.path().join("doomed.txt")).unwrap();
    repo.write_file("fresh.txt", "one\ntwo\n");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[
            ("add fresh", &["fresh.txt:0-0"]),
            ("drop doomed", &["doomed.txt:1-1"]),
        ]),
    );
    expect_success(result);

    assert_eq!(repo.commit_count(&format!("{}..HEAD", base)), 2);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);

    // After the first commit the doomed file still exists; the second
    // removes it from the tree.
    let mid = repo.git(&["ls-tree", "--name-only", "HEAD~1"]).unwrap();
    assert!(mid.lines().any(|l| l == "doomed.txt"));
    assert!(mid.lines().any(|l| l == "fresh.txt"));
    let fin = repo.git(&["ls-tree", "--name-only", "HEAD"]).unwrap();
    assert!(!fin.lines().any(|l| l == "doomed.txt"));
}

#[test]
fn empty_file_creation_uses_synthetic_hunk() {
    let repo = TestRepo::new();
    repo.write_file("a.txt", "a\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.write_file("empty.txt", "");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let (_, hunks) = extract_hunks(&repo.repository(), &base).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].id(), "empty.txt:0-0");

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("add placeholder", &["empty.txt:0-0"])]),
    );
    expect_success(result);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
}

#[test]
fn missing_trailing_newline_is_preserved() {
    let repo = TestRepo::new();
    repo.write_file("t.txt", "x\ny\nz");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.write_file("t.txt", "x\ny\nZ");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("capitalize the tail", &["t.txt:3-3"])]),
    );
    expect_success(result);

    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
    assert_eq!(repo.file_at("HEAD", "t.txt").unwrap(), "x\ny\nZ");
}

#[test]
fn paths_with_spaces_are_addressable() {
    let repo = TestRepo::new();
    repo.write_file("sp ace.txt", "a\nb\nc\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.write_file("sp ace.txt", "a\nB\nc\n");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("edit spaced file", &["sp ace.txt:2-2"])]),
    );
    expect_success(result);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
}

#[test]
fn quoted_non_ascii_paths_are_addressable() {
    let repo = TestRepo::new();
    repo.write_file("sp\u{e4}ter.txt", "x\ny\nz\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    repo.write_file("sp\u{e4}ter.txt", "x\nY\nz\n");
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    // The diff header carries the octal-quoted form; the hunk id carries the
    // decoded path.
    let (_, hunks) = extract_hunks(&repo.repository(), &base).unwrap();
    assert_eq!(hunks[0].id(), "sp\u{e4}ter.txt:2-2");

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("edit accented file", &["sp\u{e4}ter.txt:2-2"])]),
    );
    expect_success(result);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
}

#[cfg(unix)]
#[test]
fn mode_only_change_is_applied() {
    use std::os::unix::fs::PermissionsExt;

    let repo = TestRepo::new();
    repo.write_file("run.sh", "#!/bin/sh\necho hi\n");
    let base = repo.stage_all_and_commit("base").unwrap();
    let script = repo.path().join("run.sh");
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    repo.stage_all_and_commit("wip").unwrap();
    let tip_tree = repo.tree_oid("HEAD").unwrap();

    let (_, hunks) = extract_hunks(&repo.repository(), &base).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].id(), "run.sh:0-0");

    let result = run(
        &repo.repository(),
        &base,
        &plan(&[("make it executable", &["run.sh:0-0"])]),
    );
    expect_success(result);
    assert_eq!(repo.tree_oid("HEAD").unwrap(), tip_tree);
}
