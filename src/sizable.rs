//! Memory accounting.

/// `Sizable`
///
/// A hint of the memory footprint of a value, in bytes, used for memory accounting.
///
/// The figure need not be exact; a `ReadOptimizedMap` of `Sizable` items sums the hints of its items with its own
/// footprint.
///
/// #   Example
///
/// ```
/// use readswap::bitmap::BitMap;
/// use readswap::sizable::Sizable;
///
/// let bitmap = BitMap::new();
///
/// assert_eq!(bitmap.size(), bitmap.compute_size());
/// ```
pub trait Sizable {
    /// Returns the approximate memory footprint, in bytes.
    fn compute_size(&self) -> usize;
}
