//! Composing several providers with first-match-wins precedence.

use std::fmt;
use std::sync::Arc;

use crate::provider::ValueProvider;
use crate::result::ValueProviderResult;

/// An ordered list of providers consulted as one.
///
/// Providers are tried in the order they were added. The first one holding a
/// key wins, so `form > route > query` is expressed by adding them in that
/// order:
///
/// ```text
/// ValueProviderCollection
/// ├── form   → None (id not posted)
/// ├── route  → Some("42") ← returns this
/// └── query  → (not reached)
/// ```
#[derive(Clone, Default)]
pub struct ValueProviderCollection {
    providers: Vec<Arc<dyn ValueProvider>>,
}

impl ValueProviderCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a provider with lower precedence than those already added.
    pub fn with<P: ValueProvider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    pub fn push(&mut self, provider: Arc<dyn ValueProvider>) {
        self.providers.push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// The provider that answers for `key`, with its result.
    pub fn resolve(&self, key: &str) -> Option<(&'static str, ValueProviderResult)> {
        self.providers
            .iter()
            .find_map(|p| p.get_value(key).map(|r| (p.name(), r)))
    }
}

impl ValueProvider for ValueProviderCollection {
    fn name(&self) -> &'static str {
        "collection"
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.providers.iter().any(|p| p.contains_prefix(prefix))
    }

    fn get_value(&self, key: &str) -> Option<ValueProviderResult> {
        self.resolve(key).map(|(_, result)| result)
    }
}

impl fmt::Debug for ValueProviderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueProviderCollection")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
