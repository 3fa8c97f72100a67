//! In-memory ordering of pending tasks.
//!
//! The store is the record of truth; this module only decides what fires next.

mod heap;

pub use heap::{HeapViolation, IndexedHeap};
