//! The Words of a BitMap.
//!
//! A `Words` is one published version of the storage of a `BitMap`: its length is fixed, but each word may be
//! updated in place.

use crossbeam_utils::Backoff;

use super::atomic::AcqRelU64;

/// The number of bits in each word of a `BitMap`.
pub const BITS_PER_WORD: usize = 64;

//  The storage of a BitMap.
pub(crate) struct Words(Box<[AcqRelU64]>);

impl Words {
    //  Creates an instance of `number` words, all bits cleared.
    pub fn zeroed(number: usize) -> Self {
        Words((0..number).map(|_| AcqRelU64::default()).collect())
    }

    //  Returns the number of words.
    pub fn len(&self) -> usize { self.0.len() }

    //  Returns a copy of the current content.
    pub fn copy(&self) -> Self { self.grown(0) }

    //  Returns a copy of the current content, followed by `extra` zeroed words.
    pub fn grown(&self, extra: usize) -> Self {
        let words = self.0.iter()
            .map(|word| AcqRelU64::new(word.load()))
            .chain((0..extra).map(|_| AcqRelU64::default()))
            .collect();

        Words(words)
    }

    //  Returns the value of the bit at `index`, false if out of bounds.
    pub fn get(&self, index: usize) -> bool {
        let (word, mask) = locate(index);

        //  Words beyond the end are, conceptually, all zeroes.
        self.0.get(word).is_some_and(|word| word.load() & mask != 0)
    }

    //  Sets the bit at `index` to `value`.
    //
    //  #   Panics
    //
    //  If `index` is out of bounds.
    pub fn update(&self, index: usize, value: bool) {
        let (word, mask) = locate(index);
        let word = &self.0[word];

        let backoff = Backoff::new();
        let mut current = word.load();

        loop {
            let new = if value { current | mask } else { current & !mask };

            if new == current {
                return;
            }

            match word.compare_exchange(current, new) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }

            backoff.spin();
        }
    }

    //  Returns the number of bits set.
    pub fn count(&self) -> usize {
        self.0.iter().map(|word| word.load().count_ones() as usize).sum()
    }

    //  Returns the number of bits set strictly before `index`.
    pub fn count_until(&self, index: usize) -> usize {
        let (word, mask) = locate(index);

        let whole: usize = self.0.iter()
            .take(word)
            .map(|word| word.load().count_ones() as usize)
            .sum();

        let partial = self.0.get(word)
            .map_or(0, |word| (word.load() & (mask - 1)).count_ones() as usize);

        whole + partial
    }
}

//  Returns the index of the word containing the bit at `index`, and the mask of that bit within the word.
fn locate(index: usize) -> (usize, u64) {
    (index / BITS_PER_WORD, 1u64 << (index % BITS_PER_WORD))
}

//  mod tests
