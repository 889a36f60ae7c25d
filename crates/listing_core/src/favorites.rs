use std::collections::HashSet;

/// Liked master-object ids of the signed-in user.
///
/// Mutations mirror REST calls that already succeeded; the set never rolls back on its own.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FavoritesSet {
    ids: HashSet<String>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set wholesale.
    pub fn load<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
    }

    pub fn add(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_owned())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn has(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
