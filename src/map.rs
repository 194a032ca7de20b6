//! #   The ReadOptimizedMap.
//!
//! The `ReadOptimizedMap` is a concurrent sorted map, whose items carry their own key. Any number of threads may read
//! and write it concurrently; it is tuned for reads vastly outnumbering writes.
//!
//! ##  Under the covers.
//!
//! Under the covers the `ReadOptimizedMap` is an atomically swappable pointer to a `MapSnapshot`: a slice of slots,
//! sorted by key, each slot holding an item.
//!
//! -   Reading loads the current snapshot, then binary searches it: O(log N), never blocking.
//! -   Inserting or removing a key copies the slots into a new snapshot, sorts it, and publishes it with a
//!     compare-and-swap: O(N log N).
//! -   Replacing the item of a key already present swaps the item within its slot, without rebuilding the snapshot.
//!
//! Writes are optimistic: whenever another writer published in the meantime, the write restarts.
//!
//! #   Example: basic
//!
//! Items implement `Keyed`, exposing their key.
//!
//! ```
//! use readswap::map::{Keyed, ReadOptimizedMap};
//!
//! #[derive(Debug, PartialEq)]
//! struct Employee { name: String, job: String }
//!
//! impl Keyed for Employee {
//!     type Key = String;
//!
//!     fn key(&self) -> &String { &self.name }
//! }
//!
//! let map: ReadOptimizedMap<Employee> = ReadOptimizedMap::new();
//! assert_eq!(None, map.get("Peter"));
//!
//! map.set(Employee { name: "Peter".to_string(), job: "Developer".to_string() });
//! assert_eq!("Developer", map.get("Peter").unwrap().job);
//!
//! //  Setting an existing key returns the former item.
//! let former = map.set(Employee { name: "Peter".to_string(), job: "Manager".to_string() });
//! assert_eq!("Developer", former.unwrap().job);
//!
//! assert!(map.remove("Peter").is_some());
//! assert_eq!(None, map.get("Peter"));
//! ```
//!
//! #   Example: snapshots
//!
//! `get_all` returns the current snapshot, at the cost of a single atomic read. Its structure never changes: keys
//! inserted or removed later are not reflected.
//!
//! ```
//! use readswap::map::{Keyed, ReadOptimizedMap};
//!
//! struct Id(u32);
//!
//! impl Keyed for Id {
//!     type Key = u32;
//!
//!     fn key(&self) -> &u32 { &self.0 }
//! }
//!
//! let map: ReadOptimizedMap<_> = [Id(3), Id(1), Id(2)].into_iter().collect();
//!
//! let snapshot = map.get_all();
//! map.remove(&2);
//!
//! let keys: Vec<_> = snapshot.iter().map(|id| id.0).collect();
//! assert_eq!(vec![1, 2, 3], keys);
//! assert_eq!(2, map.len());
//! ```
//!
//! #   Example: sharing is caring
//!
//! ```
//! use readswap::map::{Keyed, ReadOptimizedMap};
//!
//! struct Counter { id: usize, hits: usize }
//!
//! impl Keyed for Counter {
//!     type Key = usize;
//!
//!     fn key(&self) -> &usize { &self.id }
//! }
//!
//! let map = ReadOptimizedMap::new();
//!
//! crossbeam_utils::thread::scope(|scope| {
//!     for t in 0..4 {
//!         let map = &map;
//!         scope.spawn(move |_| {
//!             for hits in 0..10 {
//!                 map.set(Counter { id: t, hits });
//!             }
//!         });
//!     }
//! }).unwrap();
//!
//! assert_eq!(4, map.len());
//! assert!(map.get_all().iter().all(|counter| counter.hits == 9));
//! ```

pub mod iterator;

mod keyed;
mod map;
#[cfg(feature = "serde")]
mod serialization;
mod snapshot;

pub use self::keyed::Keyed;
pub use self::map::{Found, ReadOptimizedMap};
pub use self::snapshot::MapSnapshot;

pub use super::sizable::Sizable;

use super::failure;
use super::sizable;
