//! Immutable key to fragment mapping.
//!
//! The registry is validated once at construction: keys must be unique and
//! well formed, and the graph of fragments injecting other fragments must be
//! acyclic. After that it only answers lookups.

use std::collections::{BTreeMap, HashSet};

use mdvar_renderer::TokenError;
use mdvar_renderer::directive::{is_valid_directive_name, scan_references};

/// Directive name used when none is given.
const DEFAULT_DIRECTIVE: &str = "embed";

/// Registry construction error.
///
/// Fatal at startup: a broken registry would mis-render every document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The same key was registered twice.
    #[error("duplicate variable key '{0}'")]
    DuplicateKey(String),
    /// Key is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid variable key '{0}': use letters, digits, '-' and '_'")]
    InvalidKey(String),
    /// Directive name used to extract references is not a valid name.
    #[error("invalid directive name '{0}'")]
    InvalidDirective(String),
    /// A fragment injects itself, directly or transitively.
    #[error("variable cycle: {}", .path.join(" -> "))]
    Cycle {
        /// Keys along the cycle; the first key is repeated at the end.
        path: Vec<String>,
    },
}

/// Lookup of a key that is not registered.
///
/// Recoverable: the compiler reports it as a warning for the token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unresolved variable '{0}'")]
pub struct UnresolvedKey(pub String);

impl From<UnresolvedKey> for TokenError {
    fn from(err: UnresolvedKey) -> Self {
        TokenError::Unresolved(err.0)
    }
}

#[derive(Debug)]
struct Entry {
    source: String,
    references: Vec<String>,
}

/// Fixed mapping from variable key to markdown fragment.
#[derive(Debug)]
pub struct VariableRegistry {
    directive: String,
    entries: BTreeMap<String, Entry>,
}

impl VariableRegistry {
    /// Build a registry whose fragments reference each other with `:embed[key]`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for duplicate or malformed keys and for
    /// cyclic fragment references.
    pub fn new<I, K, V>(entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_directive(DEFAULT_DIRECTIVE, entries)
    }

    /// Build a registry whose fragments reference each other with
    /// `:directive[key]`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] for an invalid directive name, duplicate or
    /// malformed keys, and cyclic fragment references.
    pub fn with_directive<I, K, V>(directive: &str, entries: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !is_valid_directive_name(directive) {
            return Err(RegistryError::InvalidDirective(directive.to_owned()));
        }

        let mut map = BTreeMap::new();
        for (key, source) in entries {
            let key = key.into();
            if !is_valid_key(&key) {
                return Err(RegistryError::InvalidKey(key));
            }
            if map.contains_key(&key) {
                return Err(RegistryError::DuplicateKey(key));
            }
            let source = source.into();
            let references = scan_references(&source, directive);
            map.insert(key, Entry { source, references });
        }

        for (key, entry) in &map {
            for reference in entry.references.iter().filter(|r| !map.contains_key(*r)) {
                tracing::warn!(key = %key, reference = %reference, "Variable references unregistered key");
            }
        }

        if let Some(path) = find_cycle(&map) {
            return Err(RegistryError::Cycle { path });
        }

        tracing::debug!(variables = map.len(), directive, "Built variable registry");

        Ok(Self {
            directive: directive.to_owned(),
            entries: map,
        })
    }

    /// Fragment registered under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedKey`] if `key` is not registered.
    pub fn get(&self, key: &str) -> Result<&str, UnresolvedKey> {
        self.entries
            .get(key)
            .map(|entry| entry.source.as_str())
            .ok_or_else(|| UnresolvedKey(key.to_owned()))
    }

    /// Check if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Registered keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(key, fragment)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.as_str(), entry.source.as_str()))
    }

    /// Keys the fragment under `key` injects, in order of first appearance.
    ///
    /// Empty for unregistered keys.
    #[must_use]
    pub fn references(&self, key: &str) -> &[String] {
        self.entries
            .get(key)
            .map_or(&[], |entry| entry.references.as_slice())
    }

    /// Directive name fragments use to reference each other.
    #[must_use]
    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Number of registered variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Depth-first search for a reference cycle.
fn find_cycle(entries: &BTreeMap<String, Entry>) -> Option<Vec<String>> {
    let mut done = HashSet::new();
    let mut path = Vec::new();

    entries
        .keys()
        .find_map(|key| visit(key, entries, &mut done, &mut path))
}

fn visit<'a>(
    key: &'a str,
    entries: &'a BTreeMap<String, Entry>,
    done: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    if done.contains(key) {
        return None;
    }
    if let Some(start) = path.iter().position(|k| *k == key) {
        let mut cycle: Vec<String> = path[start..].iter().map(|k| (*k).to_owned()).collect();
        cycle.push(key.to_owned());
        return Some(cycle);
    }

    // Unregistered references end the walk.
    let entry = entries.get(key)?;

    path.push(key);
    for reference in &entry.references {
        if let Some(cycle) = visit(reference, entries, done, path) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(key);

    None
}
