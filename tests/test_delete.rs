mod common;

use stagefs::*;

fn state_of(editor: &Editor, rel: &str) -> Option<FileState> {
    editor.store().get(&editor.resolve(rel)).unwrap().state
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

#[test]
fn delete_single_file() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("a.txt", "a")]);
    let editor = common::create_editor(dir.path());

    editor.delete("a.txt", DeleteOptions::default()).unwrap();
    assert!(!editor.exists("a.txt").unwrap());
    assert_eq!(state_of(&editor, "a.txt"), Some(FileState::Deleted));
    assert!(dir.path().join("a.txt").exists());
}

#[test]
fn delete_directory_marks_disk_and_memory_descendants() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("sub/a.txt", "a"), ("sub/deep/b.txt", "b")]);
    let editor = common::create_editor(dir.path());
    editor.write("sub/virtual.txt", "v", WriteOptions::default()).unwrap();
    editor.write("other/keep.txt", "k", WriteOptions::default()).unwrap();

    editor.delete("sub", DeleteOptions::default()).unwrap();

    for rel in ["sub/a.txt", "sub/deep/b.txt", "sub/virtual.txt"] {
        assert!(!editor.exists(rel).unwrap(), "{rel} should be deleted");
        assert_eq!(state_of(&editor, rel), Some(FileState::Deleted));
    }
    assert!(editor.exists("other/keep.txt").unwrap());
}

#[test]
fn delete_missing_directory_still_matches_memory() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor.write("gen/one.txt", "1", WriteOptions::default()).unwrap();
    editor.write("gen/two/three.txt", "3", WriteOptions::default()).unwrap();

    editor.delete("gen", DeleteOptions::default()).unwrap();
    assert!(!editor.exists("gen/one.txt").unwrap());
    assert!(!editor.exists("gen/two/three.txt").unwrap());
}

#[test]
fn delete_glob() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("a.txt", "a"), ("b.txt", "b"), ("c.md", "c")]);
    let editor = common::create_editor(dir.path());

    editor.delete("*.txt", DeleteOptions::default()).unwrap();
    assert!(!editor.exists("a.txt").unwrap());
    assert!(!editor.exists("b.txt").unwrap());
    assert!(editor.exists("c.md").unwrap());
}

#[test]
fn delete_with_exclusion() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("a.txt", "a"), ("b.txt", "b")]);
    let editor = common::create_editor(dir.path());

    editor
        .delete(vec!["*.txt", "!b.txt"], DeleteOptions::default())
        .unwrap();
    assert!(!editor.exists("a.txt").unwrap());
    assert!(editor.exists("b.txt").unwrap());
}

#[test]
fn delete_skips_dotfiles_unless_asked() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("sub/.hidden", "h"), ("sub/shown", "s")]);
    let editor = common::create_editor(dir.path());

    editor.delete("sub/*", DeleteOptions::default()).unwrap();
    assert!(editor.exists("sub/.hidden").unwrap());
    assert!(!editor.exists("sub/shown").unwrap());

    editor
        .delete(
            "sub/*",
            DeleteOptions {
                glob: GlobOptions {
                    dot: true,
                    ..Default::default()
                },
            },
        )
        .unwrap();
    assert!(!editor.exists("sub/.hidden").unwrap());
}

// ---------------------------------------------------------------------------
// pending rules
// ---------------------------------------------------------------------------

#[test]
fn deleted_existing_file_is_pending() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("a.txt", "a")]);
    let editor = common::create_editor(dir.path());
    editor.delete("a.txt", DeleteOptions::default()).unwrap();

    let mut file = editor.store().get(&dir.path().join("a.txt")).unwrap();
    assert!(state::is_pending(&mut file));
    assert_eq!(file.is_new, Some(false));
}

#[test]
fn created_then_deleted_file_is_not_pending() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor.write("ghost.txt", "boo", WriteOptions::default()).unwrap();
    editor.delete("ghost.txt", DeleteOptions::default()).unwrap();

    let mut file = editor.store().get(&dir.path().join("ghost.txt")).unwrap();
    assert!(!state::is_pending(&mut file));
    assert_eq!(file.is_new, Some(true));
}
