//! Provider over repeated name/value pairs (form posts, query strings).

use indexmap::IndexMap;

use crate::culture::Culture;
use crate::naming::PrefixSet;
use crate::provider::ValueProvider;
use crate::result::ValueProviderResult;

/// Values grouped by case-insensitive key, in first-seen order.
///
/// A key posted several times (`tag=a&tag=b`) yields one multi-valued
/// result whose attempted value is `a,b`.
#[derive(Debug, Clone)]
pub struct NameValueCollectionValueProvider {
    name: &'static str,
    /// Lowercased key to (key as first posted, values).
    entries: IndexMap<String, (String, Vec<String>)>,
    prefixes: PrefixSet,
    culture: Culture,
}

impl NameValueCollectionValueProvider {
    pub fn new<I, K, V>(name: &'static str, pairs: I, culture: Culture) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: IndexMap<String, (String, Vec<String>)> = IndexMap::new();
        for (key, value) in pairs {
            let key = key.into();
            entries
                .entry(key.to_ascii_lowercase())
                .or_insert_with(|| (key, Vec::new()))
                .1
                .push(value.into());
        }
        let prefixes = PrefixSet::new(entries.keys().map(String::as_str));
        Self {
            name,
            entries,
            prefixes,
            culture,
        }
    }

    /// Posted form fields, read with the request culture.
    pub fn form<I, K, V>(pairs: I, culture: Culture) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new("form", pairs, culture)
    }

    /// Query string values, always read with the invariant culture.
    pub fn query_string<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::new("query", pairs, Culture::invariant())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ValueProvider for NameValueCollectionValueProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.prefixes.contains(prefix)
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        let (_, values) = self.entries.get(&key.to_ascii_lowercase())?;
        Some(if values.len() == 1 {
            ValueProviderResult::from_string(values[0].clone(), self.culture.clone())
        } else {
            ValueProviderResult::from_strings(values.clone(), self.culture.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_repeated_keys() {
        let p = NameValueCollectionValueProvider::query_string([
            ("tag", "a"),
            ("Tag", "b"),
            ("id", "1"),
        ]);
        assert_eq!(p.len(), 2);
        let tags = p.get_value("TAG").unwrap();
        assert_eq!(tags.attempted_value(), "a,b");
        assert_eq!(tags.to_strings(), vec!["a", "b"]);
        assert_eq!(p.keys().collect::<Vec<_>>(), vec!["tag", "id"]);
    }

    #[test]
    fn test_prefix_lookup() {
        let p = NameValueCollectionValueProvider::form(
            [("person.Name", "Ann"), ("items[0]", "1")],
            Culture::invariant(),
        );
        assert!(p.contains_prefix("person"));
        assert!(p.contains_prefix("items"));
        assert!(p.contains_prefix(""));
        assert!(!p.contains_prefix("pers"));
        assert!(p.get_value("person").is_none());
    }

    #[test]
    fn test_cultures() {
        let de = Culture::from_name("de-DE").unwrap();
        let form = NameValueCollectionValueProvider::form([("x", "1")], de.clone());
        assert_eq!(form.get_value("x").unwrap().culture(), &de);
        let query = NameValueCollectionValueProvider::query_string([("x", "1")]);
        assert!(query.get_value("x").unwrap().culture().is_invariant());
    }
}
