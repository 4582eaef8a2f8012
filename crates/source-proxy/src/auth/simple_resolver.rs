use super::{ApiKey, GroupSet, KeyResolver};

use std::collections::HashMap;

/// An in-memory [`KeyResolver`].
#[derive(Debug, Default)]
pub struct SimpleKeyResolver {
    map: HashMap<String, GroupSet>,
}

impl SimpleKeyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_single<I, G>(api_key: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        let mut this = Self::new();
        this.insert(api_key, groups);
        this
    }

    /// Registers `api_key`, returning its previous groups if it was known.
    pub fn insert<I, G>(&mut self, api_key: impl Into<String>, groups: I) -> Option<GroupSet>
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        let groups = groups.into_iter().map(Into::into).collect();
        self.map.insert(api_key.into(), groups)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[async_trait::async_trait]
impl KeyResolver for SimpleKeyResolver {
    async fn groups(&self, api_key: &ApiKey) -> GroupSet {
        self.map.get(api_key.expose()).cloned().unwrap_or_default()
    }
}
