//! Serde support for the ReadOptimizedMap.
//!
//! The map is encoded as a mapping from key to item, walking the current snapshot; keys are therefore emitted in
//! ascending order, although formats are free not to preserve it.
//!
//! Decoding ignores the keys of the mapping, as each item carries its own, and builds a fresh map: the decoded items
//! are complete before any other thread can observe the map.

use std::{fmt, marker};

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use super::keyed::Keyed;
use super::map::ReadOptimizedMap;

//  Upper-bound on pre-allocation, in case of an untrustworthy size hint.
const MAX_PREALLOCATED: usize = 4096;

impl<T> Serialize for ReadOptimizedMap<T>
where
    T: Keyed + Serialize,
    T::Key: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let snapshot = self.get_all();

        let mut map = serializer.serialize_map(Some(snapshot.len()))?;

        for item in snapshot.iter() {
            map.serialize_entry(item.key(), &*item)?;
        }

        map.end()
    }
}

impl<'de, T> Deserialize<'de> for ReadOptimizedMap<T>
where
    T: Keyed + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ItemsVisitor(marker::PhantomData))
    }
}

//  Collects the items of a mapping, ignoring its keys.
struct ItemsVisitor<T>(marker::PhantomData<fn() -> T>);

impl<'de, T> Visitor<'de> for ItemsVisitor<T>
where
    T: Keyed + Deserialize<'de>,
{
    type Value = ReadOptimizedMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of items")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let capacity = access.size_hint().unwrap_or(0).min(MAX_PREALLOCATED);
        let mut items = Vec::with_capacity(capacity);

        while let Some((IgnoredAny, item)) = access.next_entry::<IgnoredAny, T>()? {
            items.push(item);
        }

        //  Sorted, and deduplicated with the last item winning.
        Ok(items.into_iter().collect())
    }
}

//  mod tests
