//! A collection of specialized atomics.
//!
//! In theory, it is perfectly possible to use a mixed of Ordering on the same
//! instance of an Atomic, depending on the situation.
//!
//! In practice, it is the author's experience that this is a rarely needed
//! capability which only makes auditing/reviewing harder.
//!
//! Thus, these little types come with pre-established memory ordering.

use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! atomic {
    ($name:ident, $underlying:ident, $raw:ident, $load_ordering:expr, $exchange_ordering:expr) => {
        pub struct $name($underlying);

        impl $name {
            pub fn new(v: $raw) -> Self { Self($underlying::new(v)) }
            pub fn load(&self) -> $raw { self.0.load($load_ordering) }

            //  Replaces the value by `new` if it is still `current`.
            //
            //  On failure, returns the value observed instead.
            pub fn compare_exchange(&self, current: $raw, new: $raw) -> Result<$raw, $raw> {
                self.0.compare_exchange(current, new, $exchange_ordering, $load_ordering)
            }
        }

        impl Default for $name {
            fn default() -> Self { Self::new(0) }
        }
    }
}

atomic!{ AcqRelU64, AtomicU64, u64, Ordering::Acquire, Ordering::AcqRel }
