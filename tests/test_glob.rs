mod common;

use std::path::{Path, PathBuf};

use stagefs::glob::{common_path, disk_glob, globify, PatternSet};
use stagefs::paths::to_slash;
use stagefs::*;

fn create_glob_tree(dir: &Path) {
    common::write_disk(
        dir,
        &[
            ("readme.txt", "readme"),
            ("notes.txt", "notes"),
            ("data.csv", "data"),
            (".hidden", "hidden"),
            ("src/main.py", "main"),
            ("src/lib.py", "lib"),
            ("src/util.rs", "util"),
            ("src/deep/mod.py", "mod"),
            ("src/deep/nested/core.py", "core"),
            ("docs/guide.md", "guide"),
            ("docs/api.md", "api"),
        ],
    );
}

/// Run `disk_glob` for patterns relative to `dir`, returning relative slash paths.
fn glob_rel(dir: &Path, patterns: &[&str], options: &GlobOptions) -> Vec<String> {
    let root = to_slash(dir);
    let patterns: Vec<String> = patterns
        .iter()
        .map(|p| match p.strip_prefix('!') {
            Some(rest) => format!("!{}/{}", root, rest),
            None => format!("{}/{}", root, p),
        })
        .collect();
    disk_glob(&patterns, options)
        .unwrap()
        .iter()
        .map(|p| to_slash(p.strip_prefix(dir).unwrap()))
        .collect()
}

// ---------------------------------------------------------------------------
// Star (*)
// ---------------------------------------------------------------------------

#[test]
fn glob_star_txt() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["*.txt"], &GlobOptions::default());
    assert_eq!(matches, vec!["notes.txt", "readme.txt"]);
}

#[test]
fn glob_star_excludes_dotfiles() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["*"], &GlobOptions::default());
    assert_eq!(matches, vec!["data.csv", "notes.txt", "readme.txt"]);
}

#[test]
fn glob_star_with_dot_option() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["*"], &GlobOptions { dot: true, ..Default::default() });
    assert_eq!(matches, vec![".hidden", "data.csv", "notes.txt", "readme.txt"]);
}

#[test]
fn glob_star_in_subdir() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["src/*.py"], &GlobOptions::default());
    assert_eq!(matches, vec!["src/lib.py", "src/main.py"]);
}

// ---------------------------------------------------------------------------
// Globstar (**)
// ---------------------------------------------------------------------------

#[test]
fn glob_globstar_recurses() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["src/**/*.py"], &GlobOptions::default());
    assert_eq!(
        matches,
        vec!["src/deep/mod.py", "src/deep/nested/core.py", "src/lib.py", "src/main.py"]
    );
}

#[test]
fn glob_braces_and_question_mark() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["docs/{api,guide}.md"], &GlobOptions::default());
    assert_eq!(matches, vec!["docs/api.md", "docs/guide.md"]);
    let matches = glob_rel(dir.path(), &["src/???.py"], &GlobOptions::default());
    assert_eq!(matches, vec!["src/lib.py"]);
}

#[test]
fn glob_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let options = GlobOptions {
        case_insensitive: true,
        ..Default::default()
    };
    let matches = glob_rel(dir.path(), &["*.TXT"], &options);
    assert_eq!(matches, vec!["notes.txt", "readme.txt"]);
}

// ---------------------------------------------------------------------------
// Lists and exclusions
// ---------------------------------------------------------------------------

#[test]
fn glob_list_keeps_pattern_order_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["docs/*.md", "*.txt", "docs/api.md"], &GlobOptions::default());
    assert_eq!(matches, vec!["docs/api.md", "docs/guide.md", "notes.txt", "readme.txt"]);
}

#[test]
fn glob_exclusion_applies_to_every_pattern() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let matches = glob_rel(dir.path(), &["src/**", "!src/deep/**"], &GlobOptions::default());
    assert_eq!(matches, vec!["src/lib.py", "src/main.py", "src/util.rs"]);
}

#[test]
fn glob_no_match_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    assert!(glob_rel(dir.path(), &["*.nothing"], &GlobOptions::default()).is_empty());
}

// ---------------------------------------------------------------------------
// globify / common_path
// ---------------------------------------------------------------------------

#[test]
fn globify_directory_then_disk_glob() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let patterns = globify(&[to_slash(&dir.path().join("docs"))]);
    let found = disk_glob(&patterns, &GlobOptions::default()).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.starts_with(dir.path().join("docs"))));
}

#[test]
fn common_path_of_directory_and_file() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let docs = dir.path().join("docs");
    assert_eq!(common_path(&Sources::from(&docs)), docs);
    assert_eq!(common_path(&Sources::from(docs.join("api.md"))), docs);
    let many = Sources::from(vec![docs.join("api.md"), dir.path().join("src/main.py")]);
    assert_eq!(common_path(&many), dir.path().to_path_buf());
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[test]
fn sources_conversions() {
    let one = Sources::from("a/*.txt");
    assert!(!one.is_many());
    assert_eq!(one.as_one(), Some("a/*.txt"));

    let many = Sources::from(["a", "!b"]);
    assert!(many.is_many());
    assert_eq!(many.as_one(), None);
    assert_eq!(many.patterns(), vec!["a".to_string(), "!b".to_string()]);
    assert_eq!(many.to_string(), "a, !b");

    let from_path = Sources::from(PathBuf::from("x/y.txt"));
    assert_eq!(from_path, Sources::One("x/y.txt".into()));
}

#[test]
fn pattern_set_applies_to_unwritten_paths() {
    let set = PatternSet::new(
        &["/p/**".to_string(), "!/p/tmp/**".to_string()],
        &GlobOptions::default(),
    )
    .unwrap();
    assert!(set.is_match(Path::new("/p/a/b.txt")));
    assert!(!set.is_match(Path::new("/p/tmp/scratch.txt")));
    assert!(!set.is_match(Path::new("/q/a.txt")));
}

#[test]
fn invalid_pattern_is_an_error() {
    let err = PatternSet::new(&["/a/[".to_string()], &GlobOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Pattern(_)));
}

// ---------------------------------------------------------------------------
// Through the editor
// ---------------------------------------------------------------------------

#[test]
fn copy_globstar_exclusion_keeps_nested_layout() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let editor = common::create_editor(dir.path());

    editor
        .copy(vec!["src/**/*.py", "!src/deep/nested/**"], "out", CopyOptions::default())
        .unwrap();
    assert!(editor.exists("out/main.py").unwrap());
    assert!(editor.exists("out/deep/mod.py").unwrap());
    assert!(!editor.exists("out/deep/nested/core.py").unwrap());
    assert!(!editor.exists("out/util.rs").unwrap());
}

#[test]
fn copy_glob_sees_in_memory_files() {
    let dir = tempfile::tempdir().unwrap();
    create_glob_tree(dir.path());
    let editor = common::create_editor(dir.path());
    editor.write("docs/draft.md", "draft", WriteOptions::default()).unwrap();

    editor.copy("docs/*.md", "site", CopyOptions::default()).unwrap();
    assert_eq!(editor.read("site/draft.md").unwrap(), "draft");
    assert_eq!(editor.read("site/api.md").unwrap(), "api");
}
