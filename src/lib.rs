//! # registrie
//!
//! A character trie registry: string keys map to values, lookups are exact,
//! and any prefix completes to the registered keys beneath it.
//!
//! Two modes share the same trie:
//!
//! - [`Registrie`] (flat): the caller picks the key of every value.
//! - [`NestedRegistrie`] (nested): keys are read from a field of each JSON
//!   object, and children are registered under `"parent child"` composed keys.
//!
//! ## Example
//!
//! ```rust
//! use registrie::Registrie;
//!
//! let mut reg: Registrie<u64> = Registrie::new();
//! reg.register("array", 1);
//! reg.register("any", 2);
//! reg.register("number", 3);
//!
//! assert_eq!(reg.query("any"), Some(&2));
//! assert_eq!(reg.candidate("a"), vec!["any", "array"]);
//!
//! reg.erase("any");
//! assert_eq!(reg.query("any"), None);
//! assert_eq!(reg.candidate("a"), vec!["array"]);
//! ```

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::Chars;

use tracing::trace;

mod error;
mod nested;

pub use error::{Error, Result};
pub use nested::{Layout, NestedRegistrie};

/// Separator between the segments of a composed key.
pub const DELIMITER: char = ' ';

// =============================================================================
// Capability interface
// =============================================================================

/// Operations shared by the flat and the nested registry.
///
/// The inherent methods of each registry are richer (they return replaced or
/// erased values); this trait is the common surface for generic callers.
pub trait Registry {
    type Value;
    /// What a single `register` call consumes.
    type Input;
    type Error;

    fn register(&mut self, input: Self::Input) -> Result<(), Self::Error>;

    fn query(&self, key: &str) -> Option<&Self::Value>;

    /// Sorted completions for `input`.
    fn candidate(&self, input: &str) -> Vec<String>;

    /// Removes `key`. Missing keys are ignored.
    fn erase(&mut self, key: &str);
}

// =============================================================================
// Entries
// =============================================================================

/// Whether a stored entry may be edited in place after registration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Read-only: [`Registrie::query_mut`] refuses it.
    #[default]
    Frozen,
    Mutable,
}

#[derive(Clone)]
struct Slot<V> {
    value: V,
    mutability: Mutability,
}

#[derive(Clone)]
struct Node<V> {
    children: BTreeMap<char, Node<V>>,
    slot: Option<Slot<V>>,
}

impl<V> Node<V> {
    fn new() -> Self {
        Self {
            children: BTreeMap::new(),
            slot: None,
        }
    }

    /// Neither an entry nor a path to one. Only the root may stay vacant.
    #[inline]
    fn is_vacant(&self) -> bool {
        self.slot.is_none() && self.children.is_empty()
    }

    fn entry_count(&self) -> usize {
        usize::from(self.slot.is_some())
            + self
                .children
                .values()
                .map(Node::entry_count)
                .sum::<usize>()
    }
}

// =============================================================================
// Trie walks
// =============================================================================

fn collect_keys<V>(node: &Node<V>, key: &mut String, out: &mut Vec<String>) {
    if node.slot.is_some() {
        out.push(key.clone());
    }
    for (&c, child) in &node.children {
        key.push(c);
        collect_keys(child, key, out);
        key.pop();
    }
}

/// Takes the slot at the end of `rest`, pruning every node emptied on the way back up.
fn take_slot<V>(node: &mut Node<V>, rest: &mut Chars<'_>) -> Option<Slot<V>> {
    let Some(c) = rest.next() else {
        return node.slot.take();
    };
    let child = node.children.get_mut(&c)?;
    let slot = take_slot(child, rest)?;
    if child.is_vacant() {
        node.children.remove(&c);
    }
    Some(slot)
}

/// Detaches the whole subtree at the end of `rest`, pruning like [`take_slot`].
fn detach<V>(node: &mut Node<V>, rest: &mut Chars<'_>) -> Option<Node<V>> {
    let Some(c) = rest.next() else {
        return Some(std::mem::replace(node, Node::new()));
    };
    let child = node.children.get_mut(&c)?;
    let subtree = detach(child, rest)?;
    if child.is_vacant() {
        node.children.remove(&c);
    }
    Some(subtree)
}

// =============================================================================
// Registrie
// =============================================================================

/// A flat registry: a character trie from string keys to values of type `V`.
///
/// Keys are walked one `char` at a time, so any Unicode string (including the
/// empty string, stored at the root) is a valid key.
#[derive(Clone)]
pub struct Registrie<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Registrie<V> {
    pub fn new() -> Self {
        Self {
            root: Node::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root = Node::new();
        self.len = 0;
    }

    fn node(&self, key: &str) -> Option<&Node<V>> {
        key.chars()
            .try_fold(&self.root, |node, c| node.children.get(&c))
    }

    fn node_mut(&mut self, key: &str) -> Option<&mut Node<V>> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.get_mut(&c)?;
        }
        Some(node)
    }

    /// Registers a frozen entry. Returns the value previously stored at `key`.
    pub fn register(&mut self, key: &str, value: V) -> Option<V> {
        self.register_with(key, value, Mutability::Frozen)
    }

    pub fn register_with(&mut self, key: &str, value: V, mutability: Mutability) -> Option<V> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_insert_with(Node::new);
        }

        let old = node
            .slot
            .replace(Slot { value, mutability })
            .map(|slot| slot.value);
        if old.is_none() {
            self.len += 1;
        }
        trace!(key, ?mutability, replaced = old.is_some(), "registered entry");
        old
    }

    pub fn query(&self, key: &str) -> Option<&V> {
        self.node(key)?.slot.as_ref().map(|slot| &slot.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.query(key).is_some()
    }

    /// Mutable access to an entry registered as [`Mutability::Mutable`].
    ///
    /// Frozen and missing entries both yield `None`.
    pub fn query_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.node_mut(key)?.slot.as_mut()? {
            Slot {
                value,
                mutability: Mutability::Mutable,
            } => Some(value),
            _ => None,
        }
    }

    pub fn mutability(&self, key: &str) -> Option<Mutability> {
        self.node(key)?.slot.as_ref().map(|slot| slot.mutability)
    }

    /// Every registered key starting with `prefix`, sorted ascending.
    ///
    /// The prefix itself is included when it is a key. An empty prefix lists
    /// all keys.
    pub fn candidate(&self, prefix: &str) -> Vec<String> {
        let Some(node) = self.node(prefix) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        let mut key = prefix.to_owned();
        collect_keys(node, &mut key, &mut out);
        out.sort_unstable();
        out
    }

    /// Removes `key` and returns its value.
    ///
    /// Nodes left without entries or children are pruned; entries that merely
    /// share a prefix with `key` (or extend it) are untouched.
    pub fn erase(&mut self, key: &str) -> Option<V> {
        let slot = take_slot(&mut self.root, &mut key.chars())?;
        self.len -= 1;
        trace!(key, "erased entry");
        Some(slot.value)
    }

    /// Removes every entry whose key starts with `prefix`, returning how many went.
    pub fn erase_prefix(&mut self, prefix: &str) -> usize {
        let Some(subtree) = detach(&mut self.root, &mut prefix.chars()) else {
            return 0;
        };
        let removed = subtree.entry_count();
        self.len -= removed;
        trace!(prefix, removed, "erased prefix");
        removed
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            stack: vec![(String::new(), &self.root)],
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl<V> Default for Registrie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: fmt::Debug> fmt::Debug for Registrie<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: AsRef<str>, V> Extend<(K, V)> for Registrie<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.register(key.as_ref(), value);
        }
    }
}

impl<K: AsRef<str>, V> FromIterator<(K, V)> for Registrie<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut reg = Self::new();
        reg.extend(iter);
        reg
    }
}

impl<V> Registry for Registrie<V> {
    type Value = V;
    type Input = (String, V);
    type Error = Infallible;

    fn register(&mut self, (key, value): (String, V)) -> Result<(), Infallible> {
        Registrie::register(self, &key, value);
        Ok(())
    }

    fn query(&self, key: &str) -> Option<&V> {
        Registrie::query(self, key)
    }

    fn candidate(&self, input: &str) -> Vec<String> {
        Registrie::candidate(self, input)
    }

    fn erase(&mut self, key: &str) {
        Registrie::erase(self, key);
    }
}

pub struct Iter<'a, V> {
    stack: Vec<(String, &'a Node<V>)>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (String, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((key, node)) = self.stack.pop() {
            for (&c, child) in node.children.iter().rev() {
                let mut child_key = String::with_capacity(key.len() + c.len_utf8());
                child_key.push_str(&key);
                child_key.push(c);
                self.stack.push((child_key, child));
            }

            if let Some(slot) = &node.slot {
                return Some((key, &slot.value));
            }
        }
        None
    }
}


#[cfg(test)]
mod proptests;
