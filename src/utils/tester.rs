//! Internal testing utilities

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::map::Keyed;
use crate::sizable::Sizable;

//  Key Value
//
//  The simplest item: a key, and a value.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: &str, value: &str) -> Self {
        KeyValue { key: key.to_string(), value: value.to_string() }
    }
}

impl Keyed for KeyValue {
    type Key = String;

    fn key(&self) -> &String { &self.key }
}

impl Sizable for KeyValue {
    fn compute_size(&self) -> usize { self.key.len() + self.value.len() }
}

//  SpyCount
//
//  A counter of the number of instances of elements.
pub struct SpyCount(AtomicUsize);

impl SpyCount {
    pub fn zero() -> Self { SpyCount(AtomicUsize::new(0)) }

    pub fn get(&self) -> usize { self.0.load(Ordering::Relaxed) }

    fn decrement(&self) { self.0.fetch_sub(1, Ordering::Relaxed); }

    fn increment(&self) { self.0.fetch_add(1, Ordering::Relaxed); }
}

//  Spy Element
//
//  An element tracking the number of instances, helpful to ensure that
//  superseded snapshots are reclaimed.
pub struct SpyElement {
    key: u32,
    count: Arc<SpyCount>,
}

impl SpyElement {
    pub fn new(key: u32, count: &Arc<SpyCount>) -> Self {
        count.increment();
        SpyElement { key, count: Arc::clone(count) }
    }
}

impl Keyed for SpyElement {
    type Key = u32;

    fn key(&self) -> &u32 { &self.key }
}

impl Drop for SpyElement {
    fn drop(&mut self) {
        self.count.decrement();
    }
}
