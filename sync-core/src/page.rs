//! Paginated, growable collections.
//!
//! [`Paged`] is the shared state behind the conversation list, the watch
//! list and a conversation's message timeline: a sequence of entities plus
//! the total the server reported. Entities are held as `Arc`s and replaced
//! whole on mutation, so an untouched element stays pointer-equal across
//! updates.
//!
//! ## Merge rule
//!
//! A page carries `count`, the number of matching rows the server still
//! holds outside the ids the request excluded (this page included).
//!
//! - Unloaded collection: the page becomes the content, `total = count`.
//! - Loaded collection: the page is prepended, `total = held_before + count`.
//! - `count == 0` or an empty page: the server is exhausted, so
//!   `total = len` and pagination stops.
//! - A non-empty page whose rows are all held already leaves the total as
//!   it was.
//!
//! Rows whose key is already held are skipped, and the total never drops
//! below the number of held rows.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;

use convo_sync_types::{Conversation, ConversationId, Message, MessageId};

/// An entity with a stable identity.
pub trait Keyed {
    /// Identity type.
    type Key: Eq + Hash + Clone;

    /// Identity of this entity, if it has one yet.
    fn key(&self) -> Option<&Self::Key>;
}

impl Keyed for Conversation {
    type Key = ConversationId;

    fn key(&self) -> Option<&ConversationId> {
        Some(&self.id)
    }
}

impl Keyed for Message {
    type Key = MessageId;

    fn key(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }
}

/// A page collection: held entities plus the server-reported total.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<T> {
    items: Vec<Arc<T>>,
    total: Option<usize>,
}

impl<T> Default for Paged<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: None,
        }
    }
}

impl<T: Keyed> Paged<T> {
    /// An unloaded collection (no total known yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection seeded from a snapshot.
    pub fn from_snapshot(items: impl IntoIterator<Item = T>, total: usize) -> Self {
        let mut paged = Self::new();
        paged.items = paged.fresh(items);
        paged.total = Some(total.max(paged.items.len()));
        paged
    }

    /// Held entities, in collection order.
    pub fn items(&self) -> &[Arc<T>] {
        &self.items
    }

    /// Server-reported total, `None` until the first page or snapshot.
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Number of held entities.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a total is known.
    pub fn is_loaded(&self) -> bool {
        self.total.is_some()
    }

    /// Whether the server reported more rows than are held.
    pub fn has_more(&self) -> bool {
        self.total.is_some_and(|total| self.items.len() < total)
    }

    /// Keys of every held entity, in collection order.
    pub fn keys(&self) -> Vec<T::Key> {
        self.items
            .iter()
            .filter_map(|item| item.key().cloned())
            .collect()
    }

    /// Index and entity with `key`.
    pub fn find(&self, key: &T::Key) -> Option<(usize, &Arc<T>)> {
        self.items
            .iter()
            .enumerate()
            .find(|(_, item)| item.key() == Some(key))
    }

    /// Entity with `key`.
    pub fn get(&self, key: &T::Key) -> Option<&Arc<T>> {
        self.find(key).map(|(_, item)| item)
    }

    /// Whether an entity with `key` is held.
    pub fn contains(&self, key: &T::Key) -> bool {
        self.find(key).is_some()
    }

    /// Merge a loaded page. Returns how many rows were added.
    pub fn merge_page(&mut self, page: impl IntoIterator<Item = T>, count: usize) -> usize {
        let held_before = self.items.len();
        let rows: Vec<T> = page.into_iter().collect();
        let exhausted = rows.is_empty() || count == 0;
        let added = self.prepend(rows);

        let total = match self.total {
            None => count,
            // Every row was already held: the page says nothing new about
            // what the server has left.
            Some(total) if added == 0 => total,
            Some(_) => held_before + count,
        };

        self.total = Some(if exhausted {
            self.items.len()
        } else {
            total.max(self.items.len())
        });
        added
    }

    /// Prepend rows fetched outside pagination, such as a lookup by id.
    ///
    /// The total only grows to cover the new rows. Returns how many were
    /// added.
    pub fn adopt(&mut self, rows: impl IntoIterator<Item = T>) -> usize {
        let added = self.prepend(rows.into_iter().collect());
        if let Some(total) = self.total {
            self.total = Some(total.max(self.items.len()));
        }
        added
    }

    /// Insert a single entity at `index` and count it in the total.
    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index.min(self.items.len()), Arc::new(item));
        let total = self.total.unwrap_or(0) + 1;
        self.total = Some(total.max(self.items.len()));
    }

    /// Replace the entity with `key` by a modified copy.
    ///
    /// `edit` returns whether it changed anything; when it did, the element
    /// is swapped for a new `Arc` and every other element is left untouched.
    pub fn modify(&mut self, key: &T::Key, edit: impl FnOnce(&mut T) -> bool) -> bool
    where
        T: Clone,
    {
        let Some(index) = self.find(key).map(|(index, _)| index) else {
            return false;
        };
        let mut next = T::clone(&self.items[index]);
        if !edit(&mut next) {
            return false;
        }
        self.items[index] = Arc::new(next);
        true
    }

    /// Whether the held entities are ordered by `key`.
    pub fn is_sorted_by_key<K: PartialOrd>(&self, mut key: impl FnMut(&T) -> K) -> bool {
        self.items
            .windows(2)
            .all(|pair| key(&pair[0]) <= key(&pair[1]))
    }

    /// Stable-sort the held entities by `key`.
    pub fn sort_by_key<K: Ord>(&mut self, mut key: impl FnMut(&T) -> K) {
        self.items.sort_by_key(|item| key(item));
    }

    /// Drop everything and forget the total.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = None;
    }

    /// Put rows not yet held in front of the held ones.
    fn prepend(&mut self, rows: Vec<T>) -> usize {
        let mut fresh = self.fresh(rows);
        let added = fresh.len();
        fresh.append(&mut self.items);
        self.items = fresh;
        added
    }

    /// Wrap rows not yet held, dropping duplicates inside the batch too.
    fn fresh(&self, rows: impl IntoIterator<Item = T>) -> Vec<Arc<T>> {
        let mut seen: HashSet<T::Key> = self.keys().into_iter().collect();
        rows.into_iter()
            .filter(|row| match row.key() {
                Some(key) => seen.insert(key.clone()),
                None => true,
            })
            .map(Arc::new)
            .collect()
    }
}
