//! Stable-index arena keyed by external IDs.

use std::collections::HashMap;

use crate::error::AppError;

/// Entities stored in a [`Collection`] expose their external ID.
pub trait Keyed {
    /// Entity kind used in error messages.
    const KIND: &'static str;

    fn key(&self) -> i32;
}

/// Arena of entities with an ID→index inverted map.
///
/// IDs are external and never assumed to match array positions.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<i32, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> Collection<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts an entity, rejecting duplicate IDs.
    pub fn insert(&mut self, item: T) -> Result<(), AppError> {
        let id = item.key();
        if self.index.contains_key(&id) {
            return Err(AppError::DuplicateId { kind: T::KIND, id });
        }
        self.index.insert(id, self.items.len());
        self.items.push(item);
        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&T> {
        self.index.get(&id).map(|&idx| &self.items[idx])
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&idx) => Some(&mut self.items[idx]),
            None => None,
        }
    }

    pub fn contains(&self, id: i32) -> bool {
        self.index.contains_key(&id)
    }

    /// Array position of an ID.
    pub fn index_of(&self, id: i32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// IDs in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.items.iter().map(Keyed::key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
