//! The contracts of items.

/// `Keyed`
///
/// An item of a `ReadOptimizedMap`, carrying its own key.
///
/// The key of an item must not change while the item is in a map.
pub trait Keyed {
    /// The key, totally ordered.
    type Key: Ord;

    /// Returns the key of the item.
    fn key(&self) -> &Self::Key;
}
