//! JSON documents: `read_json`, `write_json`, and `extend_json`.
//!
//! Output follows `JSON.stringify` conventions: configurable indentation
//! (two spaces by default, capped at ten), optional replacers, and a
//! trailing newline on every written document.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::{Map, Value};

use crate::editor::{Editor, WriteOptions};
use crate::error::{Error, Result};

/// Longest indent honoured, in spaces or characters.
const MAX_INDENT: usize = 10;

// ---------------------------------------------------------------------------
// Option structs
// ---------------------------------------------------------------------------

/// Indentation of written JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonIndent {
    /// `n` spaces per level (capped at 10); `0` writes compact JSON.
    Spaces(usize),
    /// A literal indent string, truncated to 10 characters.
    Text(String),
}

impl Default for JsonIndent {
    fn default() -> Self {
        Self::Spaces(2)
    }
}

impl JsonIndent {
    /// The indent unit, or `None` for compact output.
    fn unit(&self) -> Option<String> {
        let unit = match self {
            Self::Spaces(n) => " ".repeat((*n).min(MAX_INDENT)),
            Self::Text(s) => s.chars().take(MAX_INDENT).collect(),
        };
        (!unit.is_empty()).then_some(unit)
    }
}

/// A per-member replacer: receives the member key (`""` for the root,
/// the index for array items) and its value; `None` omits the member.
pub type ReplacerFn = Arc<dyn Fn(&str, Value) -> Option<Value> + Send + Sync>;

/// Filters what gets serialised.
#[derive(Clone)]
pub enum Replacer {
    /// Only these object keys are written, in this order, at every level.
    Keys(Vec<String>),
    Fn(ReplacerFn),
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonOptions {
    pub indent: JsonIndent,
    pub replacer: Option<Replacer>,
}

#[derive(Debug, Clone, Default)]
pub struct ReadJsonOptions {
    /// Returned when the file does not exist. A file that exists but fails
    /// to parse is an error regardless.
    pub defaults: Option<Value>,
}

// ---------------------------------------------------------------------------
// Serialisation
// ---------------------------------------------------------------------------

/// Serialise `value` the way `write_json` stores it, trailing newline
/// included.
pub fn to_json_string(value: &Value, options: &JsonOptions) -> Result<String> {
    let replaced;
    let value = match &options.replacer {
        Some(replacer) => {
            replaced = apply_replacer(replacer, "", value.clone()).unwrap_or(Value::Null);
            &replaced
        }
        None => value,
    };

    let mut out = match options.indent.unit() {
        Some(unit) => {
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(unit.as_bytes());
            let mut ser = Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut ser)?;
            String::from_utf8(buf).map_err(|e| Error::invalid_argument(e.to_string()))?
        }
        None => serde_json::to_string(value)?,
    };
    out.push('\n');
    Ok(out)
}

fn apply_replacer(replacer: &Replacer, key: &str, value: Value) -> Option<Value> {
    let value = match replacer {
        Replacer::Fn(f) => f(key, value)?,
        Replacer::Keys(_) => value,
    };
    Some(match value {
        Value::Object(map) => Value::Object(replace_members(replacer, map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| apply_replacer(replacer, &i.to_string(), item).unwrap_or(Value::Null))
                .collect(),
        ),
        other => other,
    })
}

fn replace_members(replacer: &Replacer, mut map: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    match replacer {
        Replacer::Keys(keys) => {
            for key in keys {
                if let Some(v) = map.remove(key) {
                    if let Some(v) = apply_replacer(replacer, key, v) {
                        out.insert(key.clone(), v);
                    }
                }
            }
        }
        Replacer::Fn(_) => {
            for (key, v) in map {
                if let Some(v) = apply_replacer(replacer, &key, v) {
                    out.insert(key, v);
                }
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Editor operations
// ---------------------------------------------------------------------------

impl Editor {
    /// Parse the file at `path` as JSON.
    ///
    /// A missing file yields `options.defaults`, `None` when unset. Malformed
    /// JSON is a [`Error::Parse`] naming the file.
    pub fn read_json(&self, path: impl AsRef<Path>, options: ReadJsonOptions) -> Result<Option<Value>> {
        let path = self.resolve(path);
        let file = self.store().get(&path)?;
        match file.contents {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| Error::parse(&path, e)),
            None => Ok(options.defaults),
        }
    }

    /// Serialise `value` and write it to `path`. Returns the written text.
    pub fn write_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        options: JsonOptions,
    ) -> Result<String> {
        let value = serde_json::to_value(value)?;
        let text = to_json_string(&value, &options)?;
        self.write(path, text, WriteOptions::default())
    }

    /// Deep-merge the members of `value` into the object stored at `path`
    /// and write the result. A missing file starts from `{}`.
    pub fn extend_json<T: Serialize + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        options: JsonOptions,
    ) -> Result<String> {
        let path = self.resolve(path);
        let existing = self.read_json(
            &path,
            ReadJsonOptions {
                defaults: Some(Value::Object(Map::new())),
            },
        )?;
        let Some(Value::Object(mut merged)) = existing else {
            return Err(Error::invalid_argument(format!(
                "{} does not hold a JSON object",
                path.display()
            )));
        };
        let Value::Object(extra) = serde_json::to_value(value)? else {
            return Err(Error::invalid_argument("extend_json expects an object"));
        };
        deep_merge(&mut merged, extra);
        self.write_json(&path, &Value::Object(merged), options)
    }
}

/// Merge `extra` into `target`. Nested objects merge key by key; any other
/// value replaces what was there. Existing keys keep their position.
fn deep_merge(target: &mut Map<String, Value>, extra: Map<String, Value>) {
    for (key, value) in extra {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => deep_merge(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}
