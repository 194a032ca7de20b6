//! Internal utilities.

pub mod atomic;

#[cfg(test)]
pub mod tester;
