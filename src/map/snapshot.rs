//! A Snapshot of the ReadOptimizedMap.
//!
//! The Snapshot is synchronization-free as far as its structure is concerned: the set of keys it contains never
//! changes. The item held for a given key may still be replaced in place.

use std::{borrow, fmt, ops};
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use crossbeam_utils::Backoff;

use super::iterator::Iter;
use super::keyed::Keyed;

//  A Slot, holding one item.
//
//  Slots are shared between successive snapshots: rebuilding a snapshot copies the pointers to the slots, not the
//  items, so that an item replaced in place is also replaced in any snapshot built concurrently.
//
//  A slot is retired once a removal has unpublished it. A retired slot still exposes its last item to the snapshots
//  holding it, but its item can no longer be replaced.
pub(crate) struct Slot<T>(ArcSwap<Entry<T>>);

impl<T> Slot<T> {
    //  Creates a new instance.
    pub fn new(item: Arc<T>) -> Self { Slot(ArcSwap::from_pointee(Entry::live(item))) }

    //  Returns a temporary reference to the entry.
    pub fn load(&self) -> Guard<Arc<Entry<T>>> { self.0.load() }

    //  Returns the item.
    pub fn load_full(&self) -> Arc<T> { Arc::clone(&self.0.load().item) }

    //  Returns whether the slot is retired.
    pub fn is_retired(&self) -> bool { self.0.load().retired }

    //  Replaces the item by `new`, unless the slot is retired or the item is concurrently replaced.
    //
    //  Returns the replaced item, if the replacement took place.
    pub fn replace(&self, new: Arc<T>) -> Option<Arc<T>> {
        let current = self.0.load_full();

        if current.retired {
            return None;
        }

        let previous = self.0.compare_and_swap(&current, Arc::new(Entry::live(new)));

        Arc::ptr_eq(&previous, &current).then(|| Arc::clone(&current.item))
    }

    //  Retires the slot, returning the last item it held.
    //
    //  Only to be called once the slot has been unpublished.
    pub fn retire(&self) -> Arc<T> {
        let backoff = Backoff::new();

        loop {
            let current = self.0.load_full();

            if current.retired {
                return Arc::clone(&current.item);
            }

            let retired = Entry { item: Arc::clone(&current.item), retired: true };
            let previous = self.0.compare_and_swap(&current, Arc::new(retired));

            if Arc::ptr_eq(&previous, &current) {
                return Arc::clone(&current.item);
            }

            backoff.spin();
        }
    }
}

//  The content of a Slot.
pub(crate) struct Entry<T> {
    item: Arc<T>,
    retired: bool,
}

impl<T> Entry<T> {
    fn live(item: Arc<T>) -> Self { Entry { item, retired: false } }
}

impl<T> ops::Deref for Entry<T> {
    type Target = T;

    fn deref(&self) -> &T { &self.item }
}

/// `MapSnapshot`
///
/// A `MapSnapshot` is the state of the underlying `ReadOptimizedMap` at the moment it was published.
///
/// It never reflects keys inserted or removed later; it does reflect items replaced, in place, for the keys it
/// contains.
///
/// Items are iterated on in ascending order of their keys.
pub struct MapSnapshot<T> {
    //  Invariant: sorted strictly ascending by key.
    slots: Box<[Arc<Slot<T>>]>,
}

impl<T> MapSnapshot<T> {
    //  Creates an empty instance.
    pub(crate) fn empty() -> Self {
        Self { slots: Box::new([]) }
    }

    /// Returns whether the snapshot contains any item, or not.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// let snapshot = map.get_all();
    ///
    /// map.set(Id(1));
    ///
    /// //  Insert not reflected in previous instance.
    /// assert!(snapshot.is_empty());
    ///
    /// //  Insert reflected in new instance.
    /// assert!(!map.get_all().is_empty());
    /// ```
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// Returns the number of items in the snapshot.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map: ReadOptimizedMap<_> = [Id(1), Id(2)].into_iter().collect();
    /// let snapshot = map.get_all();
    ///
    /// map.set(Id(3));
    ///
    /// assert_eq!(2, snapshot.len());
    /// assert_eq!(3, map.get_all().len());
    /// ```
    pub fn len(&self) -> usize { self.slots.len() }

    /// Returns an iterator over the items, in ascending order of their keys.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map: ReadOptimizedMap<_> = [Id(3), Id(1), Id(2)].into_iter().collect();
    ///
    /// let keys: Vec<_> = map.get_all().iter().map(|id| id.0).collect();
    /// assert_eq!(vec![1, 2, 3], keys);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> { Iter::create(self.slots.iter()) }

    //  Returns the slot at `index`.
    //
    //  #   Panics
    //
    //  If `index` is out of bounds.
    pub(crate) fn slot(&self, index: usize) -> &Arc<Slot<T>> { &self.slots[index] }
}

impl<T: Keyed> MapSnapshot<T> {
    //  Creates an instance from arbitrary items.
    //
    //  Items are sorted by key; of several items sharing a key, the last one is retained.
    pub(crate) fn from_items(mut items: Vec<Arc<T>>) -> Self {
        //  Stable: the relative order of items sharing a key is preserved.
        items.sort_by(|a, b| a.key().cmp(b.key()));

        let mut retained: Vec<Arc<T>> = Vec::with_capacity(items.len());

        for item in items {
            match retained.last_mut() {
                Some(last) if last.key() == item.key() => *last = item,
                _ => retained.push(item),
            }
        }

        let slots = retained.into_iter().map(|item| Arc::new(Slot::new(item))).collect();

        Self { slots }
    }

    /// Returns `true` if the snapshot contains an item for the specified key.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map: ReadOptimizedMap<_> = [Id(1)].into_iter().collect();
    /// let snapshot = map.get_all();
    ///
    /// map.remove(&1);
    ///
    /// assert!(snapshot.contains_key(&1));
    /// assert!(!snapshot.contains_key(&2));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_ok()
    }

    /// Returns the item corresponding to the key, if any.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map: ReadOptimizedMap<_> = [Id(1)].into_iter().collect();
    /// let snapshot = map.get_all();
    ///
    /// assert_eq!(Some(1), snapshot.get(&1).map(|id| id.0));
    /// assert!(snapshot.get(&2).is_none());
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).ok().map(|index| self.slots[index].load_full())
    }

    //  Binary searches for `key`.
    //
    //  Returns the index of its slot if present, or the index at which it would be inserted otherwise.
    pub(crate) fn search<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.slots.binary_search_by(|slot| {
            let item = slot.load();
            let candidate: &Q = borrow::Borrow::borrow(item.key());

            candidate.cmp(key)
        })
    }

    //  Returns a new instance, with an additional slot for `item`.
    //
    //  Assumes that the key of `item` is not present.
    pub(crate) fn with_inserted(&self, item: Arc<T>) -> Self {
        let mut slots = Vec::with_capacity(self.slots.len() + 1);
        slots.extend(self.slots.iter().cloned());
        slots.push(Arc::new(Slot::new(item)));

        Self::sorted(slots)
    }

    //  Returns a new instance, without the slot at `index`.
    pub(crate) fn without(&self, index: usize) -> Self {
        let mut slots = Vec::with_capacity(self.slots.len().saturating_sub(1));
        slots.extend_from_slice(&self.slots[..index]);
        slots.extend_from_slice(&self.slots[index + 1..]);

        Self::sorted(slots)
    }

    //  Creates an instance from `slots`, sorting them.
    //
    //  Insertion and removal both go through a full sort, keeping the write path uniform.
    fn sorted(mut slots: Vec<Arc<Slot<T>>>) -> Self {
        slots.sort_by(|a, b| a.load().key().cmp(b.load().key()));

        debug_assert!(slots.windows(2).all(|w| w[0].load().key() < w[1].load().key()));

        Self { slots: slots.into_boxed_slice() }
    }
}

impl<'a, T> IntoIterator for &'a MapSnapshot<T> {
    type Item = Arc<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

impl<T: fmt::Debug> fmt::Debug for MapSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

//  mod tests
