//  Lints
#![allow(clippy::module_inception)]

//! #   The ReadSwap Library
//!
//! A collection of lock-free concurrent data-structures for read-heavy workloads.
//! -   The `BitMap`: a growable vector of bits.
//! -   The `ReadOptimizedMap`: a sorted map of items carrying their own key.
//!
//! Reads never block: they load the current snapshot with a single atomic read, and work on it. Writes compute a new
//! snapshot and publish it with a compare-and-swap, restarting whenever another writer published first.

pub mod bitmap;
pub mod failure;
pub mod map;
pub mod sizable;

mod utils;

use self::utils::atomic;
