//! The BitMap

use std::{fmt, mem};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam_utils::Backoff;
use log::{debug, trace};

use super::words::{Words, BITS_PER_WORD};

use crate::sizable::Sizable;

/// `BitMap`
///
/// A `BitMap` is always `Send` and `Sync`: any number of threads may read and write it concurrently.
///
/// ```
/// # use readswap::bitmap::BitMap;
/// fn ensure_send_sync<T: Send + Sync>(_: T) {}
///
/// ensure_send_sync(BitMap::new());
/// ```
pub struct BitMap {
    //  The current storage, if any.
    //
    //  -   `None` stands for zero words: the initial, and reset, state.
    //  -   The number of words only increases, except on `reset`.
    //
    //  The slice is replaced as a whole when growing, while its words are updated in place.
    words: ArcSwapOption<Words>,
}

impl BitMap {
    /// Creates a new, empty, instance.
    ///
    /// No memory is allocated.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    ///
    /// assert_eq!(0, bitmap.count());
    /// assert_eq!(0, bitmap.capacity());
    /// ```
    pub fn new() -> Self {
        Self { words: ArcSwapOption::empty() }
    }

    /// Creates a new instance, with all bits cleared, able to hold at least `bits` bits without growing.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::with_capacity(100);
    ///
    /// assert_eq!(0, bitmap.count());
    /// assert_eq!(128, bitmap.capacity());
    /// ```
    pub fn with_capacity(bits: usize) -> Self {
        let number = bits.div_ceil(BITS_PER_WORD);

        if number == 0 {
            return Self::new();
        }

        Self { words: ArcSwapOption::new(Some(Arc::new(Words::zeroed(number)))) }
    }

    /// Clears all bits, and releases the storage.
    ///
    /// Readers still working on the former storage are unaffected.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// bitmap.set(1000, true);
    ///
    /// bitmap.reset();
    ///
    /// assert!(!bitmap.get(1000));
    /// assert_eq!(0, bitmap.capacity());
    /// ```
    pub fn reset(&self) {
        //  Unconditional: whichever storage was last published, it is replaced.
        self.words.store(None);
    }

    /// Returns an independent copy of the current state.
    ///
    /// Writes to either instance are not reflected in the other.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// bitmap.set(3, true);
    ///
    /// let copy = bitmap.copy();
    /// bitmap.set(4, true);
    /// copy.set(3, false);
    ///
    /// assert!(bitmap.get(3));
    /// assert!(!copy.get(3));
    /// assert!(!copy.get(4));
    /// ```
    pub fn copy(&self) -> Self {
        let words = self.words.load_full().map(|words| Arc::new(words.copy()));

        Self { words: ArcSwapOption::new(words) }
    }

    /// Returns the value of the ith bit.
    ///
    /// Bits beyond the current capacity are not set.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// bitmap.set(0, true);
    ///
    /// assert!(bitmap.get(0));
    /// assert!(!bitmap.get(1));
    /// assert!(!bitmap.get(64));
    /// ```
    pub fn get(&self, i: usize) -> bool {
        self.with_words(false, |words| words.get(i))
    }

    /// Sets the ith bit to `value`.
    ///
    /// The storage is grown, as necessary, to cover the ith bit.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    ///
    /// bitmap.set(6, true);
    /// assert!(bitmap.get(6));
    ///
    /// bitmap.set(6, false);
    /// assert!(!bitmap.get(6));
    /// ```
    pub fn set(&self, i: usize, value: bool) {
        let backoff = Backoff::new();

        loop {
            let words = self.grow(i / BITS_PER_WORD + 1);

            words.update(i, value);

            //  A concurrent growth may have copied the words before the update, and published the copy; in which case
            //  the update must be applied anew to the copy.
            if self.is_published(&words) {
                return;
            }

            trace!("BitMap::set - storage superseded while writing bit {}, re-applying", i);

            backoff.spin();
        }
    }

    /// Returns the number of bits set.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// assert_eq!(0, bitmap.count());
    ///
    /// bitmap.set(5, true);
    /// bitmap.set(1000, true);
    /// assert_eq!(2, bitmap.count());
    /// ```
    pub fn count(&self) -> usize {
        self.with_words(0, Words::count)
    }

    /// Returns the number of bits set strictly before `index`.
    ///
    /// Once `index` is beyond the current capacity, this is the same as `count`.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// bitmap.set(5, true);
    /// bitmap.set(6, true);
    ///
    /// assert_eq!(0, bitmap.count_until(5));
    /// assert_eq!(1, bitmap.count_until(6));
    /// assert_eq!(2, bitmap.count_until(7));
    /// assert_eq!(2, bitmap.count_until(usize::MAX));
    /// ```
    pub fn count_until(&self, index: usize) -> usize {
        self.with_words(0, |words| words.count_until(index))
    }

    /// Returns the number of bits which can be stored without growing.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// assert_eq!(0, bitmap.capacity());
    ///
    /// bitmap.set(64, true);
    /// assert_eq!(128, bitmap.capacity());
    /// ```
    pub fn capacity(&self) -> usize {
        self.number_words() * BITS_PER_WORD
    }

    /// Returns the number of words currently allocated.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let bitmap = BitMap::new();
    /// bitmap.set(1000, true);
    ///
    /// assert_eq!(16, bitmap.number_words());
    /// ```
    pub fn number_words(&self) -> usize {
        self.with_words(0, Words::len)
    }

    /// Returns the approximate memory footprint, in bytes.
    ///
    /// This is an accounting figure: the size of the instance itself, plus the size of the current storage, if any,
    /// including the reference counts. See `capacity` for the number of bits.
    ///
    /// #   Example
    ///
    /// ```
    /// #   use readswap::bitmap::BitMap;
    /// let empty = BitMap::new();
    /// assert_eq!(std::mem::size_of::<BitMap>(), empty.size());
    ///
    /// let one = BitMap::new();
    /// one.set(0, true);
    ///
    /// let two = BitMap::new();
    /// two.set(64, true);
    ///
    /// assert_eq!(8, two.size() - one.size());
    /// ```
    pub fn size(&self) -> usize {
        //  Reference counts of the Arc.
        const COUNTS: usize = 2 * mem::size_of::<usize>();

        mem::size_of::<Self>() + self.with_words(0, |words| {
            COUNTS + mem::size_of::<Words>() + words.len() * mem::size_of::<u64>()
        })
    }

    //  Ensures that the published storage has at least `number` words, and returns it.
    fn grow(&self, number: usize) -> Arc<Words> {
        debug_assert!(number > 0);

        let backoff = Backoff::new();

        loop {
            let current = self.words.load_full();

            if let Some(words) = current.as_ref().filter(|words| words.len() >= number) {
                return Arc::clone(words);
            }

            let length = current.as_ref().map_or(0, |words| words.len());
            let grown = current.as_ref().map_or_else(|| Words::zeroed(1), |words| words.grown(1));

            let previous = self.words.compare_and_swap(&current, Some(Arc::new(grown)));

            if same(&previous, &current) {
                debug!("BitMap::grow - grown to {} words", length + 1);
                continue;
            }

            trace!("BitMap::grow - contended while growing to {} words", length + 1);

            backoff.spin();
        }
    }

    //  Returns whether `words` is the currently published storage.
    fn is_published(&self, words: &Arc<Words>) -> bool {
        matches!(&*self.words.load(), Some(current) if Arc::ptr_eq(current, words))
    }

    //  Invokes `fun` on the current storage, or returns `default` if there is none.
    fn with_words<R, F>(&self, default: R, fun: F) -> R
    where
        F: FnOnce(&Words) -> R,
    {
        let guard = self.words.load();

        match &*guard {
            Some(words) => fun(words),
            None => default,
        }
    }
}

impl Clone for BitMap {
    fn clone(&self) -> Self { self.copy() }
}

impl Default for BitMap {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for BitMap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let guard = self.words.load();
        let (words, count) = match &*guard {
            Some(words) => (words.len(), words.count()),
            None => (0, 0),
        };

        f.debug_struct("BitMap")
            .field("words", &words)
            .field("count", &count)
            .finish()
    }
}

impl Sizable for BitMap {
    fn compute_size(&self) -> usize { self.size() }
}

//  Returns whether both point to the same storage, or neither points to any.
fn same(left: &Option<Arc<Words>>, right: &Option<Arc<Words>>) -> bool {
    match (left, right) {
        (Some(left), Some(right)) => Arc::ptr_eq(left, right),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {

    use std::collections::BTreeSet;

    use proptest::prelude::*;

    use super::BitMap;

    #[test]
    fn scenario() {
        let bm = BitMap::new();

        assert_eq!(0, bm.count());
        assert!(!bm.get(0));
        assert!(!bm.get(1000));

        for i in [5, 6, 77, 1000] {
            bm.set(i, true);
        }

        assert_eq!(4, bm.count());
        assert_eq!(1, bm.count_until(6));
        assert_eq!(2, bm.count_until(7));
        assert_eq!(3, bm.count_until(100));
        assert_eq!(4, bm.count_until(10000));

        for i in [0, 4, 7, 63, 64, 71, 3000] {
            assert!(!bm.get(i), "{}", i);
        }
        for i in [5, 6, 77, 1000] {
            assert!(bm.get(i), "{}", i);
        }

        bm.set(6, false);

        assert_eq!(3, bm.count());
        assert!(bm.get(5));
        assert!(!bm.get(6));

        bm.reset();

        assert!(!bm.get(0));
        assert!(!bm.get(1000));
        assert_eq!(0, bm.count());
    }

    #[test]
    fn get_first_unallocated_word() {
        let bm = BitMap::new();
        bm.set(0, true);

        assert_eq!(1, bm.number_words());
        assert!(!bm.get(64));
        assert!(!bm.get(127));
    }

    #[test]
    fn grows_one_word_at_a_time() {
        let bm = BitMap::new();

        bm.set(63, true);
        assert_eq!(1, bm.number_words());

        bm.set(64, true);
        assert_eq!(2, bm.number_words());

        bm.set(3, false);
        assert_eq!(2, bm.number_words());
    }

    #[test]
    fn clear_beyond_capacity_grows() {
        let bm = BitMap::new();
        bm.set(200, false);

        assert_eq!(4, bm.number_words());
        assert_eq!(0, bm.count());
    }

    #[test]
    fn copy_of_empty() {
        let bm = BitMap::new();
        let copy = bm.copy();

        bm.set(1, true);

        assert_eq!(0, copy.count());
        assert_eq!(0, copy.number_words());
    }

    #[test]
    fn trait_debug() {
        let bm = BitMap::new();
        bm.set(3, true);
        bm.set(100, true);

        assert_eq!("BitMap { words: 2, count: 2 }", format!("{:?}", bm));
    }

    #[test]
    fn concurrent_disjoint_set() {
        const THREADS: usize = 8;
        const BITS: usize = 2000;

        let bm = BitMap::new();

        crossbeam_utils::thread::scope(|scope| {
            for t in 0..THREADS {
                let bm = &bm;
                scope.spawn(move |_| {
                    for i in (t..BITS).step_by(THREADS) {
                        bm.set(i, true);
                    }
                });
            }
        }).unwrap();

        assert_eq!(BITS, bm.count());
        assert!((0..BITS).all(|i| bm.get(i)));
    }

    #[test]
    fn concurrent_same_word() {
        const THREADS: usize = 8;

        let bm = BitMap::with_capacity(64);

        crossbeam_utils::thread::scope(|scope| {
            for t in 0..THREADS {
                let bm = &bm;
                scope.spawn(move |_| {
                    for _ in 0..100 {
                        bm.set(t, true);
                        bm.set(t + THREADS, true);
                        bm.set(t + THREADS, false);
                    }
                });
            }
        }).unwrap();

        assert_eq!(THREADS, bm.count());
        assert_eq!(THREADS, bm.count_until(THREADS));
    }

    proptest! {
        #[test]
        fn count_matches_get(indices in prop::collection::vec(0usize..4096, 0..64)) {
            let bm = BitMap::new();
            for &i in &indices {
                bm.set(i, true);
            }

            let expected: BTreeSet<_> = indices.iter().copied().collect();
            let capacity = bm.capacity();

            prop_assert_eq!(expected.len(), bm.count());
            prop_assert_eq!(bm.count(), (0..capacity).filter(|&i| bm.get(i)).count());
        }

        #[test]
        fn count_until_is_rank(
            indices in prop::collection::vec(0usize..1024, 0..64),
            cleared in prop::collection::vec(0usize..1024, 0..16),
        ) {
            let bm = BitMap::new();
            for &i in &indices {
                bm.set(i, true);
            }
            for &i in &cleared {
                bm.set(i, false);
            }

            let mut previous = 0;
            for idx in 0..1100 {
                let rank = bm.count_until(idx);

                prop_assert!(previous <= rank);
                prop_assert_eq!((0..idx).filter(|&i| bm.get(i)).count(), rank);

                previous = rank;
            }
            prop_assert_eq!(bm.count(), previous);
        }
    }

} //  mod tests
