//! Parameter descriptors.
//!
//! A handler declares the names of its parameters, in order, through a
//! descriptor string. `#[handler]` generates it from the function signature;
//! closures registered with [`handler_fn`](crate::handler_fn) supply it by hand:
//!
//! ```text
//! "user_id, page = 1, sort = 'desc', done"
//! ```
//!
//! Each entry is a name, optionally followed by `=` and a default. Defaults
//! are applied by the binder only when nothing else matched the name:
//!
//! | default text          | bound value        |
//! |-----------------------|--------------------|
//! | `null`, `undefined`   | nothing            |
//! | `true`, `false`       | `Value::Bool`      |
//! | `'..'` or `".."`      | `Value::Str`       |
//! | integer               | `Value::Int`       |
//! | decimal               | `Value::Float`     |
//! | `[..]` or `{..}`      | `Value::Any` holding a `serde_json::Value` |
//! | anything else         | `Value::Str` as-is |
//!
//! Commas inside quotes or brackets do not separate entries. Inside a quoted
//! default, `\` escapes the next character.

use crate::value::Value;
use std::{
    any::TypeId,
    collections::HashMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// One declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    default: Option<Value>,
}

impl Param {
    /// A parameter without a default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// Ordered parameter declarations of one handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    /// Parse a descriptor string.
    pub fn parse(descriptor: &str) -> Self {
        let params = split_entries(descriptor)
            .into_iter()
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((name, default)) => Param {
                    name: name.trim().to_owned(),
                    default: parse_default(default.trim()),
                },
                None => Param::new(entry),
            })
            .collect();
        Self { params }
    }

    /// Declared names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(Param::name)
    }

    /// Iterate over the declarations.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the handler takes no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Split on top-level commas, skipping those inside quotes or brackets.
fn split_entries(descriptor: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (i, c) in descriptor.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '{' => depth += 1,
            ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(&descriptor[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(&descriptor[start..]);
    entries
}

fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            _ => out.push(c),
        }
    }
    out
}

fn parse_default(text: &str) -> Option<Value> {
    match text {
        "" | "null" | "undefined" => return None,
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }

    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'\'' || first == b'"') {
            return Some(Value::Str(unescape(&text[1..text.len() - 1])));
        }
        if (first == b'[' && last == b']') || (first == b'{' && last == b'}') {
            match serde_json::from_str::<serde_json::Value>(text) {
                Ok(json) => return Some(Value::any(json)),
                Err(_) => return Some(Value::Str(text.to_owned())),
            }
        }
    }

    if text.contains('.') {
        if let Ok(n) = text.parse::<f64>() {
            if n.is_finite() {
                return Some(Value::Float(n));
            }
        }
    } else if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Int(n));
    }

    Some(Value::Str(text.to_owned()))
}

/// Cache of parsed descriptors keyed by handler identity.
///
/// Identity is the handler's concrete type together with its descriptor, so a
/// function item is parsed exactly once no matter how many controllers export
/// it or how often they reload.
#[derive(Debug, Default)]
pub struct ParamCache {
    entries: RwLock<HashMap<(TypeId, String), Arc<ParamList>>>,
    parses: AtomicUsize,
}

impl ParamCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached list for `(id, descriptor)`, parsing on first use.
    pub fn get_or_parse(&self, id: TypeId, descriptor: &str) -> Arc<ParamList> {
        let key = (id, descriptor.to_owned());
        if let Some(hit) = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
        {
            return hit.clone();
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries
            .entry(key)
            .or_insert_with(|| {
                self.parses.fetch_add(1, Ordering::Relaxed);
                Arc::new(ParamList::parse(descriptor))
            })
            .clone()
    }

    /// How many descriptors have been parsed so far.
    pub fn parse_count(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }

    /// Number of cached handler identities.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether nothing is cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_in_order() {
        let list = ParamList::parse(" user_id ,done,, ctx ");
        let names: Vec<_> = list.names().collect();
        assert_eq!(names, vec!["user_id", "done", "ctx"]);
    }

    #[test]
    fn test_parse_empty_descriptor() {
        assert!(ParamList::parse("").is_empty());
        assert!(ParamList::parse("  ").is_empty());
    }

    #[test]
    fn test_parse_defaults() {
        let list = ParamList::parse(
            "a = 1, b = 2.5, c = 'x', d = \"y\", e = true, f = null, g = undefined, h = raw",
        );
        let defaults: Vec<_> = list.iter().map(|p| p.default_value().cloned()).collect();
        assert_eq!(
            defaults,
            vec![
                Some(Value::Int(1)),
                Some(Value::Float(2.5)),
                Some(Value::from("x")),
                Some(Value::from("y")),
                Some(Value::Bool(true)),
                None,
                None,
                Some(Value::from("raw")),
            ]
        );
    }

    #[test]
    fn test_commas_inside_quotes_and_brackets() {
        let list = ParamList::parse(r#"user = 'a,b', tags = ["x", "y"], opts = {"a": 1, "b": 2}, ctx"#);
        let names: Vec<_> = list.names().collect();
        assert_eq!(names, vec!["user", "tags", "opts", "ctx"]);
        assert_eq!(list.iter().next().and_then(Param::default_value), Some(&Value::from("a,b")));
    }

    #[test]
    fn test_escaped_quotes_in_defaults() {
        let list = ParamList::parse(r"greeting = 'it\'s, fine', path = 'c:\\tmp', done");
        let defaults: Vec<_> = list.iter().map(|p| p.default_value().cloned()).collect();
        assert_eq!(
            defaults,
            vec![
                Some(Value::from("it's, fine")),
                Some(Value::from(r"c:\tmp")),
                None,
            ]
        );
    }

    #[test]
    fn test_json_defaults() {
        let list = ParamList::parse(r#"tags = ["a", "b"], limits = {"max": 3}, broken = [1,"#);
        let json = |i: usize| {
            list.iter()
                .nth(i)
                .and_then(Param::default_value)
                .and_then(|v| v.downcast::<serde_json::Value>())
        };
        assert_eq!(json(0).as_deref(), Some(&serde_json::json!(["a", "b"])));
        assert_eq!(json(1).as_deref(), Some(&serde_json::json!({"max": 3})));
        // Unbalanced brackets swallow the rest of the descriptor as raw text.
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_cache_parses_once_per_identity() {
        struct A;
        struct B;
        let cache = ParamCache::new();

        let first = cache.get_or_parse(TypeId::of::<A>(), "x, done");
        let second = cache.get_or_parse(TypeId::of::<A>(), "x, done");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.parse_count(), 1);

        cache.get_or_parse(TypeId::of::<B>(), "x, done");
        assert_eq!(cache.parse_count(), 2);
        assert_eq!(cache.len(), 2);
    }
}
