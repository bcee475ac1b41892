//! Chain links and the iterators that walk them.

use crate::types::EventId;

/// One slot of the chain arena.
#[derive(Clone, Debug)]
pub struct ChainLink<T> {
    pub id: EventId,
    pub timestamp: f32,
    /// Slot of the following link, if any.
    pub(crate) next: Option<usize>,
    /// Absolute state at the root, a diff everywhere else.
    pub item: T,
}

impl<T> ChainLink<T> {
    pub(crate) fn new(id: EventId, timestamp: f32, item: T) -> Self {
        Self {
            id,
            timestamp,
            next: None,
            item,
        }
    }
}

/// Walks links from the root to the tail following `next`.
pub struct Links<'a, T> {
    slots: &'a [ChainLink<T>],
    cursor: Option<usize>,
}

impl<'a, T> Links<'a, T> {
    pub(crate) fn new(slots: &'a [ChainLink<T>], root: usize) -> Self {
        Self {
            slots,
            cursor: Some(root),
        }
    }
}

impl<'a, T> Iterator for Links<'a, T> {
    type Item = &'a ChainLink<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.slots.get(self.cursor?)?;
        self.cursor = link.next;
        Some(link)
    }
}

/// Items of each link, root first.
pub struct States<'a, T> {
    links: Links<'a, T>,
}

impl<'a, T> States<'a, T> {
    pub(crate) fn new(links: Links<'a, T>) -> Self {
        Self { links }
    }
}

impl<'a, T> Iterator for States<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.links.next().map(|link| &link.item)
    }
}
