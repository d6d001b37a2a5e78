//! Binary file detection, used to skip template rendering.

use std::io::Read;
use std::path::Path;

/// How many leading bytes are inspected when sniffing.
const SNIFF_LEN: usize = 512;

const BINARY_EXTENSIONS: &[&str] = &[
    "7z", "a", "avi", "bin", "bmp", "bz2", "class", "dat", "db", "dll", "dmg", "doc", "docx",
    "dylib", "eot", "exe", "flac", "gif", "gz", "ico", "icns", "iso", "jar", "jpeg", "jpg", "lib",
    "m4a", "mkv", "mov", "mp3", "mp4", "o", "obj", "ogg", "otf", "pdf", "png", "ppt", "pptx", "psd",
    "pyc", "rar", "so", "sqlite", "tar", "tgz", "tif", "tiff", "ttf", "wasm", "wav", "webm", "webp",
    "woff", "woff2", "xls", "xlsx", "xz", "zip",
];

const TEXT_EXTENSIONS: &[&str] = &[
    "c", "cfg", "conf", "cpp", "cs", "css", "csv", "ejs", "env", "go", "h", "hbs", "hpp", "htm",
    "html", "ini", "j2", "java", "jinja", "js", "json", "jsx", "kt", "less", "lock", "md", "mjs",
    "php", "py", "rb", "rs", "sass", "scss", "sh", "sql", "svg", "swift", "toml", "ts", "tsx",
    "txt", "vue", "xml", "yaml", "yml",
];

/// Decide whether the file at `path` is binary.
///
/// The extension decides when it is known. Otherwise the bytes already on
/// disk are sniffed, then `contents` if given.
pub fn is_binary(path: &Path, contents: Option<&[u8]>) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        let ext = ext.to_ascii_lowercase();
        if BINARY_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return false;
        }
    }
    if let Some(head) = read_head(path) {
        if sniff(&head) {
            return true;
        }
    }
    contents.map(sniff).unwrap_or(false)
}

fn read_head(path: &Path) -> Option<Vec<u8>> {
    let file = std::fs::File::open(path).ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
    Some(head)
}

/// Content heuristic over the leading bytes.
///
/// Magic numbers and NUL bytes mean binary; valid UTF-8 means text;
/// anything else is binary when more than a tenth of it is control bytes.
pub fn sniff(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];
    if head.is_empty() {
        return false;
    }
    if has_magic(head) {
        return true;
    }
    if head.contains(&0) {
        return nul_means_binary(head);
    }
    match std::str::from_utf8(head) {
        Ok(_) => return false,
        // A multi-byte character cut off by the sniff window.
        Err(e) if e.error_len().is_none() => return false,
        Err(_) => {}
    }
    let suspicious = head
        .iter()
        .filter(|&&b| b < 7 || (b > 13 && b < 32 && b != 27))
        .count();
    suspicious * 10 > head.len()
}

fn has_magic(head: &[u8]) -> bool {
    const MAGIC: &[&[u8]] = &[
        b"\x89PNG\r\n\x1a\n",
        b"GIF87a",
        b"GIF89a",
        b"\xff\xd8\xff",
        b"%PDF-",
        b"PK\x03\x04",
        b"\x1f\x8b",
        b"\x7fELF",
        b"\0asm",
    ];
    MAGIC.iter().any(|m| head.starts_with(m))
}

/// NUL bytes are expected in UTF-16 text with a byte-order mark.
fn nul_means_binary(head: &[u8]) -> bool {
    !(head.starts_with(b"\xff\xfe") || head.starts_with(b"\xfe\xff"))
}
