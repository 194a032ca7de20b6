//! Iterators over the ReadOptimizedMap.

use std::{iter, slice};
use std::sync::Arc;

use super::snapshot::Slot;

/// An iterator over the items of a `MapSnapshot`, in ascending order of their keys.
pub struct Iter<'a, T>(slice::Iter<'a, Arc<Slot<T>>>);

impl<'a, T> Iter<'a, T> {
    pub(crate) fn create(iterator: slice::Iter<'a, Arc<Slot<T>>>) -> Self {
        Self(iterator)
    }
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<'a, T> iter::Iterator for Iter<'a, T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Arc<T>> {
        self.0.next().map(|slot| slot.load_full())
    }

    fn size_hint(&self) -> (usize, Option<usize>) { self.0.size_hint() }
}

impl<'a, T> iter::DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Arc<T>> {
        self.0.next_back().map(|slot| slot.load_full())
    }
}

impl<'a, T> iter::ExactSizeIterator for Iter<'a, T> {}

impl<'a, T> iter::FusedIterator for Iter<'a, T> {}
