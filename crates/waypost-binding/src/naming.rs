//! Field-path naming rules shared by providers, binders and model state.
//!
//! ```text
//! person            → top-level model
//! person.Name       → property   (create_sub_property_name)
//! person.Tags[0]    → element    (create_sub_index_name)
//! person.Tags.index → explicit index tokens for person.Tags
//! ```

use std::collections::HashSet;

/// Builds `prefix.property`, or just `property` when the prefix is empty.
pub fn create_sub_property_name(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else if property.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, property)
    }
}

/// Builds `prefix[index]`.
pub fn create_sub_index_name(prefix: &str, index: &str) -> String {
    format!("{}[{}]", prefix, index)
}

/// Returns true if `key` lies at or below `prefix` in the field tree.
///
/// Comparison is ASCII case-insensitive. `person` matches `person`,
/// `person.Name` and `person[0]`, but not `personnel`. The empty prefix
/// matches every key.
pub fn is_prefix_match(prefix: &str, key: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match key.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => {
            matches!(key.as_bytes().get(prefix.len()), None | Some(b'.') | Some(b'['))
        }
        _ => false,
    }
}

/// Returns true if any of `keys` lies at or below `prefix`.
pub fn contains_prefix<'a, I>(keys: I, prefix: &str) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    keys.into_iter().any(|key| is_prefix_match(prefix, key))
}

/// Every field path at or above a fixed set of keys.
///
/// Providers build one up front so [`contains`](Self::contains) answers
/// [`is_prefix_match`] for all keys with a single lookup. `person.Tags[0]`
/// contributes `""`, `person`, `person.tags` and `person.tags[0]`.
#[derive(Debug, Clone, Default)]
pub struct PrefixSet {
    prefixes: HashSet<String>,
}

impl PrefixSet {
    pub fn new<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = Self::default();
        for key in keys {
            set.insert(key);
        }
        set
    }

    pub fn insert(&mut self, key: &str) {
        let lower = key.to_ascii_lowercase();
        self.prefixes.insert(String::new());
        for (i, byte) in lower.bytes().enumerate() {
            if byte == b'.' || byte == b'[' {
                self.prefixes.insert(lower[..i].to_string());
            }
        }
        self.prefixes.insert(lower);
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.prefixes.contains(&prefix.to_ascii_lowercase())
    }
}

/// The last dotted segment of a model name, used as a fallback display name.
pub(crate) fn last_segment(model_name: &str) -> &str {
    model_name.rsplit('.').next().unwrap_or(model_name)
}
