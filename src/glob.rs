//! Copy and delete sources, pattern normalization and matching.
//!
//! A copy or delete source is a path, a directory, a glob, or a list of
//! those (entries prefixed with `!` exclude). [`globify`] turns each entry
//! into patterns that match the files it denotes, [`disk_glob`] expands them
//! on the real filesystem, and [`PatternSet`] applies them to paths already
//! tracked in memory with ordered include/exclude semantics.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::paths::{self, to_slash};

/// Characters that make a pattern dynamic.
const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// One path/pattern, or a list of them.
///
/// The distinction matters: a single literal file is copied to its
/// destination verbatim, while a list always relativizes destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sources {
    One(String),
    Many(Vec<String>),
}

impl Sources {
    /// All entries, in order.
    pub fn patterns(&self) -> Vec<String> {
        match self {
            Self::One(p) => vec![p.clone()],
            Self::Many(ps) => ps.clone(),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// The single entry, if this is not a list.
    pub fn as_one(&self) -> Option<&str> {
        match self {
            Self::One(p) => Some(p),
            Self::Many(_) => None,
        }
    }

    /// Resolve every entry against `cwd`.
    pub(crate) fn resolve(&self, cwd: &Path) -> Self {
        match self {
            Self::One(p) => Self::One(paths::resolve_pattern(cwd, p)),
            Self::Many(ps) => Self::Many(ps.iter().map(|p| paths::resolve_pattern(cwd, p)).collect()),
        }
    }
}

impl fmt::Display for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(p) => f.write_str(p),
            Self::Many(ps) => f.write_str(&ps.join(", ")),
        }
    }
}

impl From<&str> for Sources {
    fn from(s: &str) -> Self {
        Self::One(s.to_string())
    }
}

impl From<String> for Sources {
    fn from(s: String) -> Self {
        Self::One(s)
    }
}

impl From<&String> for Sources {
    fn from(s: &String) -> Self {
        Self::One(s.clone())
    }
}

impl From<&Path> for Sources {
    fn from(p: &Path) -> Self {
        Self::One(to_slash(p))
    }
}

impl From<PathBuf> for Sources {
    fn from(p: PathBuf) -> Self {
        Self::One(to_slash(&p))
    }
}

impl From<&PathBuf> for Sources {
    fn from(p: &PathBuf) -> Self {
        Self::One(to_slash(p))
    }
}

impl From<Vec<String>> for Sources {
    fn from(v: Vec<String>) -> Self {
        Self::Many(v)
    }
}

impl From<Vec<&str>> for Sources {
    fn from(v: Vec<&str>) -> Self {
        Self::Many(v.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for Sources {
    fn from(v: &[&str]) -> Self {
        Self::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Sources {
    fn from(v: [&str; N]) -> Self {
        Self::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<PathBuf>> for Sources {
    fn from(v: Vec<PathBuf>) -> Self {
        Self::Many(v.iter().map(|p| to_slash(p)).collect())
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Matching behaviour shared by disk and in-memory globbing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobOptions {
    /// Let wildcards match path segments starting with `.`.
    pub dot: bool,
    pub case_insensitive: bool,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Returns `true` if `pattern` contains glob syntax.
pub fn is_dynamic_pattern(pattern: &str) -> bool {
    pattern.contains(GLOB_CHARS)
}

/// Turn each entry into patterns matching the files it denotes.
///
/// - globs and `!` exclusions pass through unchanged;
/// - an existing file stays as it is;
/// - an existing directory matches all of its descendants;
/// - a path that does not exist matches either a file or a directory there.
pub fn globify(patterns: &[String]) -> Vec<String> {
    patterns.iter().flat_map(|p| globify_one(p)).collect()
}

fn globify_one(pattern: &str) -> Vec<String> {
    if pattern.starts_with('!') || is_dynamic_pattern(pattern) {
        return vec![pattern.to_string()];
    }
    match std::fs::metadata(pattern) {
        Ok(meta) if meta.is_dir() => vec![descendants(pattern)],
        Ok(_) => vec![pattern.to_string()],
        Err(_) => vec![pattern.to_string(), descendants(pattern)],
    }
}

fn descendants(dir: &str) -> String {
    format!("{}/**", dir.trim_end_matches('/'))
}

/// The directory destinations are computed relative to.
///
/// For a list: the common ancestor of every non-excluded entry's own common
/// path. For a glob: the parent of everything up to the first wildcard. For
/// an existing directory: the directory itself. Otherwise: the parent.
pub fn common_path(sources: &Sources) -> PathBuf {
    match sources {
        Sources::One(p) => common_path_one(p),
        Sources::Many(ps) => {
            let dirs: Vec<PathBuf> = ps
                .iter()
                .filter(|p| !p.starts_with('!'))
                .map(|p| common_path_one(p))
                .collect();
            paths::common_dir(&dirs).unwrap_or_default()
        }
    }
}

fn common_path_one(pattern: &str) -> PathBuf {
    if let Some(idx) = pattern.find(GLOB_CHARS) {
        return paths::dirname(Path::new(&pattern[..=idx]));
    }
    let path = Path::new(pattern);
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => path.to_path_buf(),
        _ => paths::dirname(path),
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A single compiled pattern.
#[derive(Debug, Clone)]
struct Rule {
    matcher: GlobMatcher,
    negated: bool,
    /// Literal directory prefix, before the first dynamic segment.
    base: String,
    /// Wildcards may match dot segments (option set, or the pattern names one).
    allow_dot: bool,
}

impl Rule {
    fn new(pattern: &str, options: &GlobOptions) -> Result<Self> {
        let (negated, raw) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        let matcher = GlobBuilder::new(raw)
            .literal_separator(true)
            .case_insensitive(options.case_insensitive)
            .build()
            .map_err(|e| Error::pattern(raw, e))?
            .compile_matcher();
        let (base, tail) = split_literal_base(raw);
        let allow_dot = options.dot || tail.split('/').any(|seg| seg.starts_with('.'));
        Ok(Self {
            matcher,
            negated,
            base,
            allow_dot,
        })
    }

    fn matches(&self, path: &str) -> bool {
        if !self.matcher.is_match(path) {
            return false;
        }
        if self.allow_dot {
            return true;
        }
        let rest = path.strip_prefix(self.base.as_str()).unwrap_or(path);
        !rest.split('/').any(|seg| seg.starts_with('.'))
    }
}

/// Split a pattern into its literal directory prefix and the dynamic rest.
fn split_literal_base(pattern: &str) -> (String, String) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let first_dynamic = segments
        .iter()
        .position(|seg| is_dynamic_pattern(seg))
        .unwrap_or(segments.len());
    let mut base = segments[..first_dynamic].join("/");
    if base.is_empty() && pattern.starts_with('/') {
        base.push('/');
    }
    let tail = segments[first_dynamic..].join("/");
    (base, tail)
}

/// Ordered include/exclude patterns applied to individual paths.
///
/// Entries are evaluated in order: a positive pattern adds a matching path,
/// a `!` pattern removes it again. A set holding only exclusions matches
/// nothing.
#[derive(Debug, Clone)]
pub struct PatternSet {
    rules: Vec<Rule>,
}

impl PatternSet {
    pub fn new(patterns: &[String], options: &GlobOptions) -> Result<Self> {
        let rules = patterns
            .iter()
            .map(|p| Rule::new(p, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    pub fn is_match(&self, path: &Path) -> bool {
        let path = to_slash(path);
        let mut matched = false;
        for rule in &self.rules {
            if rule.negated {
                if matched && rule.matches(&path) {
                    matched = false;
                }
            } else if !matched && rule.matches(&path) {
                matched = true;
            }
        }
        matched
    }
}

/// Expand patterns against the real filesystem, returning files only.
///
/// Results keep pattern order, then walk order (sorted by name), without
/// duplicates. Paths matching any `!` pattern are dropped.
pub fn disk_glob(patterns: &[String], options: &GlobOptions) -> Result<Vec<PathBuf>> {
    let exclusions = patterns
        .iter()
        .filter(|p| p.starts_with('!'))
        .map(|p| Rule::new(p, options))
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    let mut results = Vec::new();
    let mut keep = |path: PathBuf| {
        let slash = to_slash(&path);
        if exclusions.iter().any(|rule| rule.matches(&slash)) {
            return;
        }
        if seen.insert(path.clone()) {
            results.push(path);
        }
    };

    for pattern in patterns.iter().filter(|p| !p.starts_with('!')) {
        if !is_dynamic_pattern(pattern) {
            if let Ok(meta) = std::fs::metadata(pattern) {
                if meta.is_file() {
                    keep(PathBuf::from(pattern));
                }
            }
            continue;
        }

        let rule = Rule::new(pattern, options)?;
        if !Path::new(&rule.base).is_dir() {
            continue;
        }
        for entry in WalkDir::new(&rule.base).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir()) {
                continue;
            }
            if rule.matches(&to_slash(entry.path())) {
                keep(entry.path().to_path_buf());
            }
        }
    }

    Ok(results)
}
