mod common;

use serde_json::json;
use stagefs::*;

// ---------------------------------------------------------------------------
// append
// ---------------------------------------------------------------------------

#[test]
fn append_trims_and_uses_eol() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor.write("f.txt", "a\n\n\n", WriteOptions::default()).unwrap();
    editor.append("f.txt", "b", AppendOptions::default()).unwrap();
    assert_eq!(editor.read("f.txt").unwrap(), "a\nb");
}

#[test]
fn append_uses_editor_eol() {
    let dir = tempfile::tempdir().unwrap();
    let editor = Editor::with_options(
        MemStore::new(),
        EditorOptions {
            cwd: Some(dir.path().to_path_buf()),
            eol: Some("\r\n".into()),
            ..Default::default()
        },
    )
    .unwrap();
    editor.write("f.txt", "a", WriteOptions::default()).unwrap();
    editor.append("f.txt", "b", AppendOptions::default()).unwrap();
    assert_eq!(editor.read("f.txt").unwrap(), "a\r\nb");
}

#[test]
fn append_without_trim_and_custom_separator() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor.write("f.txt", "a\n", WriteOptions::default()).unwrap();
    editor
        .append(
            "f.txt",
            "b",
            AppendOptions {
                trim_end: false,
                separator: Some(", ".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(editor.read("f.txt").unwrap(), "a\n, b");
}

#[test]
fn append_to_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    let err = editor.append("nope.txt", "b", AppendOptions::default()).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn append_with_create_writes_plainly() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor
        .append(
            "new.txt",
            "first",
            AppendOptions {
                create: true,
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(editor.read("new.txt").unwrap(), "first");
}

#[test]
fn append_to_disk_file() {
    let dir = tempfile::tempdir().unwrap();
    common::write_disk(dir.path(), &[("log.txt", "one\n")]);
    let editor = common::create_editor(dir.path());
    editor.append("log.txt", "two", AppendOptions::default()).unwrap();
    assert_eq!(editor.read("log.txt").unwrap(), "one\ntwo");
}

// ---------------------------------------------------------------------------
// append_tpl
// ---------------------------------------------------------------------------

#[test]
fn append_tpl_renders_first() {
    let dir = tempfile::tempdir().unwrap();
    let editor = common::create_editor(dir.path());
    editor.write("f.txt", "header", WriteOptions::default()).unwrap();
    editor
        .append_tpl(
            "f.txt",
            "hello {{ name }}",
            &json!({"name": "world"}),
            TemplateOptions::default(),
            AppendOptions::default(),
        )
        .unwrap();
    assert_eq!(editor.read("f.txt").unwrap(), "header\nhello world");
}
