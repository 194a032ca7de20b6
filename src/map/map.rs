//! The ReadOptimizedMap

use std::{borrow, fmt, iter, mem};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_utils::Backoff;
use log::trace;

use super::failure::{Failure, Result};
use super::keyed::Keyed;
use super::sizable::Sizable;
use super::snapshot::{Entry, MapSnapshot, Slot};

/// `ReadOptimizedMap`
///
/// A `ReadOptimizedMap<T>` can be shared across threads whenever `T` can.
///
/// #   Example of Sync.
///
/// ```
/// # use readswap::map::{Keyed, ReadOptimizedMap};
/// fn ensure_sync<T: Send + Sync>(_: T) {}
///
/// struct Name(String);
///
/// impl Keyed for Name {
///     type Key = String;
///
///     fn key(&self) -> &String { &self.0 }
/// }
///
/// let map = ReadOptimizedMap::new();
/// map.set(Name("Hello".to_string()));
///
/// ensure_sync(map);
/// ```
///
/// #   Example of not Sync.
///
/// A non-Sync item prevents the `ReadOptimizedMap` from being shared.
///
/// ```compile_fail
/// # use std::rc::Rc;
/// # use readswap::map::{Keyed, ReadOptimizedMap};
/// fn ensure_sync<T: Sync>(_: T) {}
///
/// struct Shared(u32, Rc<u32>);
///
/// impl Keyed for Shared {
///     type Key = u32;
///
///     fn key(&self) -> &u32 { &self.0 }
/// }
///
/// let map = ReadOptimizedMap::new();
/// map.set(Shared(1, Rc::new(1)));
///
/// ensure_sync(map);
/// ```
pub struct ReadOptimizedMap<T> {
    //  The current snapshot:
    //
    //  -   Readers load it once per operation.
    //  -   Writers publish a new one with a compare-and-swap against the one they read, or check that the one they
    //      read is still current after replacing an item in place.
    snapshot: ArcSwap<MapSnapshot<T>>,
}

/// `Found`
///
/// The result of `ReadOptimizedMap::find_item`: the item, its position, and the snapshot they were found in.
pub struct Found<T> {
    /// The item, if the key is present.
    pub item: Option<Arc<T>>,
    /// The index of the item within `handle`, if the key is present.
    pub index: Option<usize>,
    /// The snapshot searched, to be passed to `ReadOptimizedMap::try_insert`.
    pub handle: Arc<MapSnapshot<T>>,
}

impl<T> ReadOptimizedMap<T> {
    /// Creates a new, empty, instance.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::ReadOptimizedMap;
    /// let map: ReadOptimizedMap<(u32, u32)> = ReadOptimizedMap::new();
    ///
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::from_snapshot(MapSnapshot::empty())
    }

    /// Returns the current snapshot.
    ///
    /// The snapshot is immutable, and is not affected by later insertions and removals; this is the way to enumerate
    /// the items of the map.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// map.set(Id(2));
    /// map.set(Id(1));
    ///
    /// let snapshot = map.get_all();
    /// map.set(Id(0));
    ///
    /// let keys: Vec<_> = snapshot.iter().map(|id| id.0).collect();
    /// assert_eq!(vec![1, 2], keys);
    /// ```
    pub fn get_all(&self) -> Arc<MapSnapshot<T>> {
        self.snapshot.load_full()
    }

    /// Returns whether the map contains any item, or not.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// assert!(map.is_empty());
    ///
    /// map.set(Id(1));
    /// assert!(!map.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Returns the number of items in the map.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// assert_eq!(0, map.len());
    ///
    /// map.set(Id(1));
    /// map.set(Id(1));
    /// assert_eq!(1, map.len());
    /// ```
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    fn from_snapshot(snapshot: MapSnapshot<T>) -> Self {
        Self { snapshot: ArcSwap::from_pointee(snapshot) }
    }

    //  Publishes `next` in place of `handle`, if `handle` is still current.
    //
    //  Returns whether the publication took place.
    fn publish(&self, handle: &Arc<MapSnapshot<T>>, next: Arc<MapSnapshot<T>>) -> bool {
        let previous = self.snapshot.compare_and_swap(handle, next);

        Arc::ptr_eq(&previous, handle)
    }
}

impl<T: Keyed> ReadOptimizedMap<T> {
    /// Returns the item corresponding to the key, if any.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// map.set(Id(1));
    ///
    /// assert_eq!(Some(1), map.get(&1).map(|id| id.0));
    /// assert!(map.get(&2).is_none());
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.snapshot.load().get(key)
    }

    /// Returns `true` if the map contains an item for the specified key.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// map.set(Id(1));
    ///
    /// assert!(map.contains_key(&1));
    /// assert!(!map.contains_key(&2));
    /// ```
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.snapshot.load().contains_key(key)
    }

    /// Returns the item corresponding to the key, if any, along with its index and the snapshot searched.
    ///
    /// This is the read half of the low-level write protocol, see `try_insert`.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// map.set(Id(1));
    /// map.set(Id(3));
    ///
    /// let found = map.find_item(&3);
    /// assert_eq!(Some(3), found.item.map(|id| id.0));
    /// assert_eq!(Some(1), found.index);
    ///
    /// let found = map.find_item(&2);
    /// assert!(found.item.is_none());
    /// assert_eq!(None, found.index);
    /// assert_eq!(2, found.handle.len());
    /// ```
    pub fn find_item<Q>(&self, key: &Q) -> Found<T>
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.snapshot.load_full();

        let (item, index) = match handle.search(key) {
            Ok(index) => (Some(handle.slot(index).load_full()), Some(index)),
            Err(_) => (None, None),
        };

        Found { item, index, handle }
    }

    /// Publishes `item` under its key.
    ///
    /// Returns the item formerly held for that key, if any.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct KeyValue(u32, &'static str);
    /// #   impl Keyed for KeyValue { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    ///
    /// assert!(map.set(KeyValue(1, "one")).is_none());
    /// assert_eq!("one", map.set(KeyValue(1, "uno")).unwrap().1);
    /// assert_eq!("uno", map.get(&1).unwrap().1);
    /// ```
    pub fn set(&self, item: T) -> Option<Arc<T>> {
        self.set_arc(Arc::new(item))
    }

    /// Publishes `item` under its key.
    ///
    /// Returns the item formerly held for that key, if any.
    ///
    /// If the key is already present, the item is replaced in place, without rebuilding the snapshot. Otherwise, a new
    /// snapshot containing the item is built and published.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use std::sync::Arc;
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// let item = Arc::new(Id(1));
    ///
    /// map.set_arc(Arc::clone(&item));
    ///
    /// assert!(Arc::ptr_eq(&item, &map.get(&1).unwrap()));
    /// ```
    pub fn set_arc(&self, item: Arc<T>) -> Option<Arc<T>> {
        let backoff = Backoff::new();

        //  The slot in which `item` was stored by an attempt whose check failed, and the item it replaced.
        let mut pending: Option<(Arc<Slot<T>>, Arc<T>)> = None;

        loop {
            let handle = self.snapshot.load_full();

            if let Some((replaced, previous)) = pending.take() {
                //  Either the slot is still published, and so is `item`, or a removal unpublished it and consumes
                //  whichever item it holds upon retiring it. In both cases the replacement took effect.
                let published = handle.search(item.key()).is_ok_and(|index| Arc::ptr_eq(handle.slot(index), &replaced));

                trace!(
                    "ReadOptimizedMap::set - replacement settled, slot published: {}, retired: {}",
                    published,
                    replaced.is_retired()
                );

                return Some(previous);
            }

            match handle.search(item.key()) {
                Ok(index) => {
                    let slot = handle.slot(index);

                    //  Fails if the slot was retired by a concurrent removal, or replaced into concurrently.
                    if let Some(previous) = slot.replace(Arc::clone(&item)) {
                        //  Check that no structural change occurred in the meantime.
                        if self.publish(&handle, Arc::clone(&handle)) {
                            return Some(previous);
                        }

                        pending = Some((Arc::clone(slot), previous));
                    }
                }
                Err(_) => {
                    let next = Arc::new(handle.with_inserted(Arc::clone(&item)));

                    if self.publish(&handle, next) {
                        return None;
                    }
                }
            }

            trace!("ReadOptimizedMap::set - contended, restarting");

            backoff.spin();
        }
    }

    /// Removes the item corresponding to the key, if any.
    ///
    /// Returns the item removed, if any.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map = ReadOptimizedMap::new();
    /// map.set(Id(1));
    ///
    /// assert_eq!(Some(1), map.remove(&1).map(|id| id.0));
    /// assert!(map.remove(&1).is_none());
    /// assert!(map.is_empty());
    /// ```
    pub fn remove<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        T::Key: borrow::Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let backoff = Backoff::new();

        loop {
            let handle = self.snapshot.load_full();

            let Ok(index) = handle.search(key) else {
                return None;
            };

            let slot = Arc::clone(handle.slot(index));
            let next = Arc::new(handle.without(index));

            //  Retiring the unpublished slot settles any replacement racing with the removal.
            if self.publish(&handle, next) {
                return Some(slot.retire());
            }

            trace!("ReadOptimizedMap::remove - contended, restarting");

            backoff.spin();
        }
    }

    /// Attempts to publish a new snapshot, containing the items of `handle` and `item`, in place of `handle`.
    ///
    /// This is the write half of the low-level write protocol: the caller decides whether, and how, to retry.
    ///
    /// Returns the new snapshot on success.
    ///
    /// #   Errors
    ///
    /// -   `Failure::KeyPresent` if `handle` already contains the key of `item`, it is left as is.
    /// -   `Failure::Contended` if `handle` is no longer the current snapshot.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use std::sync::Arc;
    /// #   use readswap::failure::Failure;
    /// #   use readswap::map::{Keyed, ReadOptimizedMap};
    /// #   struct Id(u32);
    /// #   impl Keyed for Id { type Key = u32; fn key(&self) -> &u32 { &self.0 } }
    /// let map: ReadOptimizedMap<Id> = ReadOptimizedMap::new();
    ///
    /// let stale = map.find_item(&1).handle;
    /// map.set(Id(2));
    ///
    /// assert_eq!(Err(Failure::Contended), map.try_insert(&stale, Arc::new(Id(1))).map(|_| ()));
    ///
    /// let found = map.find_item(&1);
    /// assert_eq!(Err(Failure::KeyPresent), map.try_insert(&found.handle, Arc::new(Id(2))).map(|_| ()));
    ///
    /// let snapshot = map.try_insert(&found.handle, Arc::new(Id(1))).unwrap();
    /// assert_eq!(2, snapshot.len());
    /// assert!(map.contains_key(&1));
    /// ```
    pub fn try_insert(&self, handle: &Arc<MapSnapshot<T>>, item: Arc<T>) -> Result<Arc<MapSnapshot<T>>> {
        if handle.search(item.key()).is_ok() {
            return Err(Failure::KeyPresent);
        }

        let next = Arc::new(handle.with_inserted(item));

        if self.publish(handle, Arc::clone(&next)) {
            Ok(next)
        } else {
            Err(Failure::Contended)
        }
    }
}

impl<T> Default for ReadOptimizedMap<T> {
    fn default() -> Self { Self::new() }
}

impl<T: fmt::Debug> fmt::Debug for ReadOptimizedMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let snapshot = self.snapshot.load();

        f.debug_struct("ReadOptimizedMap")
            .field("len", &snapshot.len())
            .field("items", &**snapshot)
            .finish()
    }
}

impl<T: Keyed> iter::FromIterator<T> for ReadOptimizedMap<T> {
    fn from_iter<C>(collection: C) -> Self
    where
        C: IntoIterator<Item = T>,
    {
        let items = collection.into_iter().map(Arc::new).collect();

        Self::from_snapshot(MapSnapshot::from_items(items))
    }
}

impl<T: Keyed> iter::Extend<T> for ReadOptimizedMap<T> {
    fn extend<C>(&mut self, collection: C)
    where
        C: IntoIterator<Item = T>,
    {
        for item in collection {
            self.set(item);
        }
    }
}

impl<T: Keyed + Sizable> Sizable for ReadOptimizedMap<T> {
    fn compute_size(&self) -> usize {
        //  Reference counts of an Arc.
        const COUNTS: usize = 2 * mem::size_of::<usize>();

        let snapshot = self.snapshot.load();

        let own = mem::size_of::<Self>() + COUNTS + mem::size_of::<MapSnapshot<T>>();
        let per_slot = mem::size_of::<Arc<Slot<T>>>()
            + COUNTS + mem::size_of::<Slot<T>>()
            + COUNTS + mem::size_of::<Entry<T>>()
            + COUNTS;
        let items: usize = snapshot.iter().map(|item| item.compute_size()).sum();

        own + snapshot.len() * per_slot + items
    }
}

//  mod tests
