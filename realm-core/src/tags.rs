//! Ordered registry of detectable tags

use serde::{Deserialize, Serialize};

/// Ordered list of object categories a grid sensor can perceive
///
/// Order matters: a tag's position is its encoded index, and when a lookup
/// could match more than one entry the earliest one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagRegistry {
    tags: Vec<String>,
}

impl TagRegistry {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Index of the first registered tag equal to `tag`
    pub fn index_of(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let tags = TagRegistry::new(["wall", "coin", "wall"]);
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.index_of("wall"), Some(0));
        assert_eq!(tags.index_of("coin"), Some(1));
        assert_eq!(tags.index_of("lava"), None);
    }

    #[test]
    fn test_get_and_iter() {
        let tags: TagRegistry = ["a", "b"].into_iter().collect();
        assert_eq!(tags.get(1), Some("b"));
        assert_eq!(tags.get(2), None);
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
