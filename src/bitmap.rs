//! #   The BitMap.
//!
//! The `BitMap` is a concurrent, growable, vector of bits. Any number of threads may read and write it concurrently.
//!
//! ##  Under the covers.
//!
//! Under the covers the `BitMap` is an atomically swappable pointer to a slice of 64-bits words:
//!
//! -   The length of the slice is copy-on-write: growing the `BitMap` copies the words into a slice one word longer,
//!     then publishes it with a compare-and-swap.
//! -   The content of the words is mutable-in-place: setting or clearing a bit is a compare-and-swap of the word.
//!
//! The main consequences are:
//!
//! -   Reading a bit is a single atomic load, and never blocks.
//! -   Setting a bit far beyond the current length is expensive, as the slice grows one word at a time.
//! -   The memory footprint only ever grows, until `reset` is called.
//!
//! #   Example: basic
//!
//! ```
//! use readswap::bitmap::BitMap;
//!
//! let bitmap = BitMap::new();
//! bitmap.set(5, true);
//! bitmap.set(77, true);
//!
//! assert!(bitmap.get(5));
//! assert!(!bitmap.get(6));
//! assert!(!bitmap.get(1_000_000));
//!
//! assert_eq!(2, bitmap.count());
//! ```
//!
//! #   Example: ranking
//!
//! The `count_until` method counts the bits set strictly before an index; it is the rank of that index.
//!
//! ```
//! use readswap::bitmap::BitMap;
//!
//! let bitmap = BitMap::new();
//! for i in [5, 6, 77, 1000] {
//!     bitmap.set(i, true);
//! }
//!
//! assert_eq!(1, bitmap.count_until(6));
//! assert_eq!(2, bitmap.count_until(7));
//! assert_eq!(3, bitmap.count_until(100));
//! assert_eq!(4, bitmap.count_until(10_000));
//! ```
//!
//! #   Example: sharing is caring
//!
//! The `BitMap` is `Sync`, and may be written to from multiple threads at once.
//!
//! When a stable view across several reads is necessary, `copy` creates an independent `BitMap`.
//!
//! ```
//! use readswap::bitmap::BitMap;
//!
//! let bitmap = BitMap::new();
//!
//! crossbeam_utils::thread::scope(|scope| {
//!     for t in 0..4 {
//!         let bitmap = &bitmap;
//!         scope.spawn(move |_| {
//!             for i in 0..100 {
//!                 bitmap.set(i * 4 + t, true);
//!             }
//!         });
//!     }
//! }).unwrap();
//!
//! let copy = bitmap.copy();
//! bitmap.reset();
//!
//! assert_eq!(0, bitmap.count());
//! assert_eq!(400, copy.count());
//! ```

mod bitmap;
mod words;

pub use self::bitmap::BitMap;
pub use self::words::BITS_PER_WORD;

use super::atomic;
