use std::path::{Component, Path, PathBuf};

/// Resolve `path` against `cwd` and fold `.`/`..` segments lexically.
///
/// Absolute inputs ignore `cwd`. `..` never climbs above the root.
///
/// # Arguments
/// * `cwd` - Base directory for relative paths. Expected to be absolute.
/// * `path` - The raw path to resolve.
pub fn resolve(cwd: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&cwd.join(path))
    }
}

/// Lexically normalize a path: drop `.` segments, fold `..` into the parent,
/// and collapse repeated separators.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                // Never pop past a root or prefix.
                let poppable = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if poppable {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve a pattern string, keeping a leading `!` negation marker.
pub fn resolve_pattern(cwd: &Path, pattern: &str) -> String {
    match pattern.strip_prefix('!') {
        Some(rest) => format!("!{}", to_slash(&resolve(cwd, rest))),
        None => to_slash(&resolve(cwd, pattern)),
    }
}

/// Render a path with `/` separators, the form glob patterns are written in.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// The path of `path` relative to `base`, using `..` where needed.
///
/// Both inputs are expected to be absolute and normalized.
pub fn relative(base: &Path, path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix(base) {
        return rest.to_path_buf();
    }
    let base_comps: Vec<Component> = base.components().collect();
    let path_comps: Vec<Component> = path.components().collect();
    let shared = base_comps
        .iter()
        .zip(path_comps.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out = PathBuf::new();
    for _ in shared..base_comps.len() {
        out.push("..");
    }
    for comp in &path_comps[shared..] {
        out.push(comp.as_os_str());
    }
    out
}

/// The deepest directory that contains every path in `paths`.
///
/// Returns `None` for an empty input.
pub fn common_dir(paths: &[PathBuf]) -> Option<PathBuf> {
    let (first, rest) = paths.split_first()?;
    let mut common: Vec<Component> = first.components().collect();
    for path in rest {
        let comps: Vec<Component> = path.components().collect();
        let shared = common
            .iter()
            .zip(comps.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    let mut out = PathBuf::new();
    for comp in common {
        out.push(comp.as_os_str());
    }
    Some(out)
}

/// The parent directory, treating a root as its own parent.
pub fn dirname(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ if path.has_root() => path.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
