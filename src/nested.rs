//! Nested mode: keys read from JSON objects and composed across a hierarchy.
//!
//! Every object in a registered tree is stored on its own, under the keys of
//! its ancestors and its own key joined by [`DELIMITER`]:
//!
//! ```rust
//! use registrie::{Layout, NestedRegistrie};
//! use serde_json::json;
//!
//! let mut reg = NestedRegistrie::new(Layout::keyed("usage").with_children("subCommands"))?;
//! reg.register(json!({
//!     "usage": "color",
//!     "subCommands": [
//!         { "usage": "red" },
//!         { "usage": "green", "subCommands": [{ "usage": "dark" }, { "usage": "light" }] }
//!     ]
//! }))?;
//!
//! assert_eq!(reg.query("color green dark"), Some(&json!({ "usage": "dark" })));
//! assert_eq!(reg.candidate("color "), vec!["green", "red"]);
//! assert_eq!(reg.candidate("color green "), vec!["dark", "light"]);
//! # Ok::<(), registrie::Error>(())
//! ```

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{Error, Mutability, Node, Registrie, Registry, Result, DELIMITER};

/// Which object fields a [`NestedRegistrie`] reads.
///
/// Deserializes from configuration such as
/// `{"keyField": "usage", "childrenField": "subCommands"}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Layout {
    pub key_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_field: Option<String>,
}

impl Layout {
    /// Objects keyed by `key_field`, with no hierarchy.
    pub fn keyed(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            children_field: None,
        }
    }

    pub fn with_children(mut self, children_field: impl Into<String>) -> Self {
        self.children_field = Some(children_field.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.key_field.is_empty() || self.children_field.as_deref() == Some("") {
            return Err(Error::EmptyFieldName);
        }
        Ok(())
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Next-segment completions below `node`. Walks stop at the delimiter.
fn collect_segments<V>(node: &Node<V>, segment: &mut String, out: &mut BTreeSet<String>) {
    if node.slot.is_some() {
        out.insert(segment.clone());
    }
    for (&c, child) in &node.children {
        if c == DELIMITER {
            out.insert(segment.clone());
            continue;
        }
        segment.push(c);
        collect_segments(child, segment, out);
        segment.pop();
    }
}

/// A registry of JSON objects keyed by one of their own fields.
///
/// With a children field configured, each child is also registered under
/// `"<parent key> <child key>"`, recursively. Key segments are expected not to
/// contain [`DELIMITER`]; such segments are stored as-is but split the
/// segmented completions of [`candidate`](Self::candidate).
#[derive(Clone, Debug)]
pub struct NestedRegistrie {
    layout: Layout,
    trie: Registrie<Value>,
}

impl NestedRegistrie {
    pub fn new(layout: Layout) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            trie: Registrie::new(),
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Number of stored entries, descendants included.
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub fn clear(&mut self) {
        self.trie.clear();
    }

    pub fn into_inner(self) -> Registrie<Value> {
        self.trie
    }

    fn segment(&self, object: &Map<String, Value>, path: &str) -> Result<String> {
        let field = &self.layout.key_field;
        match object.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            // Floats print without a trailing `.0`: `1.0` keys as `1`.
            Some(Value::Number(n)) => Ok(match n.as_f64() {
                Some(f) if n.is_f64() => f.to_string(),
                _ => n.to_string(),
            }),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(_) => Err(Error::KeyNotScalar {
                path: path.to_owned(),
                field: field.clone(),
            }),
            None => Err(Error::MissingKeyField {
                path: path.to_owned(),
                field: field.clone(),
            }),
        }
    }

    /// Validates `value` and its whole subtree, listing `(composed key, object)`
    /// pairs in pre-order. Nothing is written.
    fn plan<'a>(
        &self,
        value: &'a Value,
        parent: Option<&str>,
        path: &str,
        out: &mut Vec<(String, &'a Value)>,
    ) -> Result<()> {
        let Value::Object(object) = value else {
            return Err(Error::NotAnObject {
                path: path.to_owned(),
                found: kind(value),
            });
        };

        let segment = self.segment(object, path)?;
        if segment.contains(DELIMITER) {
            warn!(path, segment = %segment, "key segment contains the delimiter");
        }
        let key = match parent {
            Some(parent) => format!("{parent}{DELIMITER}{segment}"),
            None => segment,
        };
        out.push((key.clone(), value));

        let Some(field) = &self.layout.children_field else {
            return Ok(());
        };
        match object.get(field) {
            None => Ok(()),
            Some(Value::Array(children)) => {
                for (i, child) in children.iter().enumerate() {
                    self.plan(child, Some(&key), &format!("{path}.{field}[{i}]"), out)?;
                }
                Ok(())
            }
            Some(_) => Err(Error::ChildrenNotArray {
                path: path.to_owned(),
                field: field.clone(),
            }),
        }
    }

    /// Registers `value` and all its descendants as frozen entries.
    ///
    /// Key fields may be strings, numbers or booleans. Numbers are rendered in
    /// their shortest form, so `1.0` and `1` both key as `"1"`.
    pub fn register(&mut self, value: Value) -> Result<()> {
        self.register_with(value, Mutability::Frozen).map(|_| ())
    }

    /// Registers `value` and all its descendants, returning how many entries were written.
    ///
    /// The whole subtree is validated first; on error the registry is unchanged.
    pub fn register_with(&mut self, value: Value, mutability: Mutability) -> Result<usize> {
        let mut planned = Vec::new();
        if let Err(err) = self.plan(&value, None, "$", &mut planned) {
            warn!(error = %err, "rejected nested registration");
            return Err(err);
        }

        for (key, entry) in &planned {
            self.trie.register_with(key, (*entry).clone(), mutability);
        }
        if let Some((root, _)) = planned.first() {
            debug!(root = %root, entries = planned.len(), "registered nested entries");
        }
        Ok(planned.len())
    }

    /// Serializes `value` to JSON and registers it like [`register`](Self::register).
    pub fn register_serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.register(value)
    }

    pub fn query(&self, key: &str) -> Option<&Value> {
        self.trie.query(key)
    }

    /// Deserializes the entry at `key` into `T`.
    pub fn query_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.trie.query(key) else {
            return Ok(None);
        };
        Ok(Some(T::deserialize(value)?))
    }

    pub fn query_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.trie.query_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.trie.contains_key(key)
    }

    pub fn mutability(&self, key: &str) -> Option<Mutability> {
        self.trie.mutability(key)
    }

    /// Completions for the last segment of `input`, one level deep.
    ///
    /// `"color "` lists the child segments of `color`, `"color gr"` those
    /// starting with `gr`. Results are bare segments, not composed keys, sorted
    /// and deduplicated.
    pub fn candidate(&self, input: &str) -> Vec<String> {
        let Some(node) = self.trie.node(input) else {
            return Vec::new();
        };

        let segment = input
            .rsplit_once(DELIMITER)
            .map_or(input, |(_, tail)| tail);
        let mut out = BTreeSet::new();
        let mut buf = segment.to_owned();
        collect_segments(node, &mut buf, &mut out);
        out.into_iter().collect()
    }

    /// Removes `key` together with every key nested below it.
    ///
    /// Keys that only share characters with `key` survive: erasing `color`
    /// removes `color green` but not `color-mix`. Returns the number of
    /// entries removed.
    pub fn erase(&mut self, key: &str) -> usize {
        let own = usize::from(self.trie.erase(key).is_some());
        let nested = self.trie.erase_prefix(&format!("{key}{DELIMITER}"));
        let removed = own + nested;
        if removed > 0 {
            debug!(key, removed, "erased nested entries");
        }
        removed
    }

    /// Entries in ascending composed-key order.
    pub fn iter(&self) -> crate::Iter<'_, Value> {
        self.trie.iter()
    }
}

impl Registry for NestedRegistrie {
    type Value = Value;
    type Input = Value;
    type Error = Error;

    fn register(&mut self, input: Value) -> Result<()> {
        NestedRegistrie::register(self, input)
    }

    fn query(&self, key: &str) -> Option<&Value> {
        NestedRegistrie::query(self, key)
    }

    fn candidate(&self, input: &str) -> Vec<String> {
        NestedRegistrie::candidate(self, input)
    }

    fn erase(&mut self, key: &str) {
        NestedRegistrie::erase(self, key);
    }
}
