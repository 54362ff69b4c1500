use std::sync::Arc;

use indexmap::IndexMap;

use super::tag::ConfigTag;

/// Multi-valued index from tag name to tags, in document order.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    source: String,
    tags: IndexMap<String, Vec<Arc<ConfigTag>>>,
}

impl ConfigStore {
    pub fn from_tags(source: &str, tags: Vec<Arc<ConfigTag>>) -> Self {
        let mut index: IndexMap<String, Vec<Arc<ConfigTag>>> = IndexMap::new();
        for tag in tags {
            index
                .entry(tag.name().to_ascii_lowercase())
                .or_default()
                .push(tag);
        }
        Self {
            source: source.to_string(),
            tags: index,
        }
    }

    /// Identifier of the top-level source this store was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The `index`th tag called `name`, in document order.
    pub fn get_tag(&self, name: &str, index: usize) -> Option<Arc<ConfigTag>> {
        self.tags(name).get(index).cloned()
    }

    pub fn tags(&self, name: &str) -> &[Arc<ConfigTag>] {
        self.tags
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct tag names in order of first appearance.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
