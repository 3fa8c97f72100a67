//! Indexed min-heap of pending tasks.
//!
//! `slots` is a binary heap ordered by `(scheduled_at, seq)`; `index` maps
//! every key in the heap to its current slot. Both are updated together in
//! `swap_slots`, which is the only place slots move.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{ScheduledTask, TaskKey};

#[derive(Debug, Clone)]
struct Slot {
    task: ScheduledTask,
    /// Insertion sequence; breaks ties between equal `scheduled_at`.
    seq: u64,
}

impl Slot {
    fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.task.scheduled_at(), self.seq)
    }
}

/// A broken heap or index invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeapViolation {
    #[error("slot {child} is due before its parent slot {parent}")]
    Order { parent: usize, child: usize },

    #[error("index says {key} is at slot {recorded}, but slot {recorded} holds {found:?}")]
    Index {
        key: TaskKey,
        recorded: usize,
        found: Option<TaskKey>,
    },

    #[error("index has {index_len} entries for {heap_len} slots")]
    Size { index_len: usize, heap_len: usize },
}

/// Min-heap by scheduled time with O(1) key lookup and O(log n) removal by key.
#[derive(Debug, Default)]
pub struct IndexedHeap {
    slots: Vec<Slot>,
    index: HashMap<TaskKey, usize>,
    next_seq: u64,
}

impl IndexedHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.index.contains_key(key)
    }

    /// Current slot of `key`, if present.
    pub fn position(&self, key: &TaskKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.slots.iter().map(|slot| slot.task.key())
    }

    /// Insert a task. A key that is already queued is handed back untouched.
    pub fn push(&mut self, task: ScheduledTask) -> Result<(), ScheduledTask> {
        if self.index.contains_key(task.key()) {
            return Err(task);
        }
        let pos = self.slots.len();
        self.index.insert(task.key().clone(), pos);
        self.slots.push(Slot {
            task,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.sift_up(pos);
        Ok(())
    }

    pub fn peek(&self) -> Option<&ScheduledTask> {
        self.slots.first().map(|slot| &slot.task)
    }

    pub fn pop(&mut self) -> Option<ScheduledTask> {
        if self.slots.is_empty() {
            return None;
        }
        let last = self.slots.len() - 1;
        self.swap_slots(0, last);
        let slot = self.slots.pop()?;
        self.index.remove(slot.task.key());
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Some(slot.task)
    }

    /// Remove the task stored under `key`. Absent keys are a no-op.
    pub fn remove(&mut self, key: &TaskKey) -> Option<ScheduledTask> {
        let pos = *self.index.get(key)?;
        let last = self.slots.len() - 1;
        self.swap_slots(pos, last);
        let slot = self.slots.pop()?;
        self.index.remove(slot.task.key());
        if pos < self.slots.len() {
            // The element moved into `pos` may belong above or below it.
            if self.sift_down(pos) == pos {
                self.sift_up(pos);
            }
        }
        Some(slot.task)
    }

    /// Drain everything in pop order.
    pub fn drain_sorted(&mut self) -> Vec<ScheduledTask> {
        let mut out = Vec::with_capacity(self.slots.len());
        while let Some(task) = self.pop() {
            out.push(task);
        }
        out
    }

    /// Verify heap order and that the index mirrors the slots exactly.
    pub fn check_invariants(&self) -> Result<(), HeapViolation> {
        if self.index.len() != self.slots.len() {
            return Err(HeapViolation::Size {
                index_len: self.index.len(),
                heap_len: self.slots.len(),
            });
        }
        for child in 1..self.slots.len() {
            let parent = (child - 1) / 2;
            if self.slots[child].sort_key() < self.slots[parent].sort_key() {
                return Err(HeapViolation::Order { parent, child });
            }
        }
        for (key, &recorded) in &self.index {
            let found = self.slots.get(recorded).map(|slot| slot.task.key());
            if found != Some(key) {
                return Err(HeapViolation::Index {
                    key: key.clone(),
                    recorded,
                    found: found.cloned(),
                });
            }
        }
        Ok(())
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.slots[a].sort_key() < self.slots[b].sort_key()
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        if let Some(p) = self.index.get_mut(self.slots[a].task.key()) {
            *p = a;
        }
        if let Some(p) = self.index.get_mut(self.slots[b].task.key()) {
            *p = b;
        }
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap_slots(pos, parent);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) -> usize {
        let len = self.slots.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                return pos;
            }
            self.swap_slots(pos, smallest);
            pos = smallest;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn task(key: &str, secs: i64) -> ScheduledTask {
        ScheduledTask::message(TaskKey::new(key), at(secs), "r@example.com", "body")
    }

    fn keys_of(tasks: &[ScheduledTask]) -> Vec<&str> {
        tasks.iter().map(|t| t.key().as_str()).collect()
    }

    #[test]
    fn pops_in_time_order() {
        let mut heap = IndexedHeap::new();
        heap.push(task("c", 10)).unwrap();
        heap.push(task("a", 1)).unwrap();
        heap.push(task("b", 5)).unwrap();

        assert_eq!(heap.peek().map(|t| t.key().as_str()), Some("a"));
        let drained = heap.drain_sorted();
        assert_eq!(keys_of(&drained), vec!["a", "b", "c"]);
        assert!(heap.pop().is_none());
    }

    #[test]
    fn equal_times_pop_in_insertion_order() {
        let mut heap = IndexedHeap::new();
        for key in ["first", "second", "third", "fourth"] {
            heap.push(task(key, 3)).unwrap();
        }
        let drained = heap.drain_sorted();
        assert_eq!(keys_of(&drained), vec!["first", "second", "third", "fourth"]);
    }

    #[test]
    fn duplicate_key_is_handed_back() {
        let mut heap = IndexedHeap::new();
        heap.push(task("k", 1)).unwrap();
        let rejected = heap.push(task("k", 0)).unwrap_err();
        assert_eq!(rejected.scheduled_at(), at(0));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.peek().unwrap().scheduled_at(), at(1));
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut heap = IndexedHeap::new();
        heap.push(task("k", 1)).unwrap();
        assert!(heap.remove(&TaskKey::new("missing")).is_none());
        assert_eq!(heap.len(), 1);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let mut heap = IndexedHeap::new();
        for (i, key) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            heap.push(task(key, i as i64)).unwrap();
        }

        assert_eq!(heap.remove(&TaskKey::new("a")).unwrap().key().as_str(), "a");
        heap.check_invariants().unwrap();
        assert_eq!(heap.remove(&TaskKey::new("d")).unwrap().key().as_str(), "d");
        heap.check_invariants().unwrap();
        assert_eq!(heap.remove(&TaskKey::new("g")).unwrap().key().as_str(), "g");
        heap.check_invariants().unwrap();

        assert!(!heap.contains(&TaskKey::new("d")));
        assert_eq!(keys_of(&heap.drain_sorted()), vec!["b", "c", "e", "f"]);
    }

    #[test]
    fn removal_can_move_the_replacement_up() {
        // Slot layout: 0=a(0) 1=b(10) 2=c(1) 3=d(11) 4=e(12) 5=f(2)
        // Removing d moves f (time 2) under b (time 10): it has to sift up.
        let mut heap = IndexedHeap::new();
        for (key, secs) in [("a", 0), ("b", 10), ("c", 1), ("d", 11), ("e", 12), ("f", 2)] {
            heap.push(task(key, secs)).unwrap();
        }
        heap.check_invariants().unwrap();
        heap.remove(&TaskKey::new("d")).unwrap();
        heap.check_invariants().unwrap();
        assert_eq!(keys_of(&heap.drain_sorted()), vec!["a", "c", "f", "b", "e"]);
    }

    #[test]
    fn position_tracks_the_slot() {
        let mut heap = IndexedHeap::new();
        heap.push(task("late", 10)).unwrap();
        assert_eq!(heap.position(&TaskKey::new("late")), Some(0));
        heap.push(task("early", 1)).unwrap();
        assert_eq!(heap.position(&TaskKey::new("early")), Some(0));
        assert_eq!(heap.position(&TaskKey::new("late")), Some(1));
        assert_eq!(heap.position(&TaskKey::new("nope")), None);
    }

    #[test]
    fn randomized_mutation_keeps_index_in_lockstep() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut heap = IndexedHeap::new();
        // Reference model: key -> time
        let mut model: BTreeMap<String, i64> = BTreeMap::new();

        for step in 0..4_000 {
            let roll: u8 = rng.gen_range(0..10);
            if roll < 5 {
                let key = format!("k{}", rng.gen_range(0..300));
                let secs = rng.gen_range(-50..500);
                let pushed = heap.push(task(&key, secs)).is_ok();
                assert_eq!(pushed, !model.contains_key(&key), "step {step}");
                model.entry(key).or_insert(secs);
            } else if roll < 8 {
                let key = format!("k{}", rng.gen_range(0..300));
                let removed = heap.remove(&TaskKey::new(key.as_str()));
                assert_eq!(removed.is_some(), model.remove(&key).is_some(), "step {step}");
            } else if let Some(popped) = heap.pop() {
                let min = model.values().copied().min().unwrap();
                assert_eq!(popped.scheduled_at(), at(min), "step {step}");
                model.remove(popped.key().as_str());
            }
            heap.check_invariants().unwrap();
            assert_eq!(heap.len(), model.len());
        }

        let drained = heap.drain_sorted();
        assert!(drained.windows(2).all(|w| w[0].scheduled_at() <= w[1].scheduled_at()));
        assert_eq!(drained.len(), model.len());
    }
}
