//! The global table (C3): an open-addressed hash map from string content to
//! `Value`, with tombstone deletion. Keys are compared by `(length, hash,
//! bytes)` rather than by reference identity — see §4.2 / §9 for why.

use std::rc::Rc;

use crate::value::{Value, VString};

const INITIAL_CAPACITY: usize = 8;
const MAX_LOAD_FACTOR: f64 = 0.75;

enum Slot {
    Empty,
    Tombstone,
    Occupied { key: Rc<VString>, value: Value },
}

pub struct GlobalTable {
    slots: Vec<Slot>,
    count: usize,
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self { slots: Vec::new(), count: 0 }
    }
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, key: &VString) -> Option<Value> {
        if self.slots.is_empty() {
            return None;
        }
        let index = self.find_slot(key);
        match &self.slots[index] {
            Slot::Occupied { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: Rc<VString>, value: Value) {
        if self.count + 1 > (self.capacity() as f64 * MAX_LOAD_FACTOR) as usize {
            self.grow();
        }
        let index = self.find_slot(&key);
        let is_new = !matches!(self.slots[index], Slot::Occupied { .. });
        if is_new && matches!(self.slots[index], Slot::Empty) {
            self.count += 1;
        }
        self.slots[index] = Slot::Occupied { key, value };
    }

    pub fn delete(&mut self, key: &VString) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let index = self.find_slot(key);
        if matches!(self.slots[index], Slot::Occupied { .. }) {
            self.slots[index] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    pub fn free(&mut self) {
        self.slots.clear();
        self.count = 0;
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Linear probe from `key.hash() % capacity`: returns the first occupied
    /// slot holding an equal key, otherwise the first tombstone seen along
    /// the probe (if any), otherwise the first empty slot.
    fn find_slot(&self, key: &VString) -> usize {
        let capacity = self.capacity();
        let mut index = key.hash() as usize % capacity;
        let mut tombstone: Option<usize> = None;
        loop {
            match &self.slots[index] {
                Slot::Empty => return tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Occupied { key: k, .. } if k.as_ref() == key => return index,
                Slot::Occupied { .. } => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.capacity() < INITIAL_CAPACITY {
            INITIAL_CAPACITY
        } else {
            self.capacity() * 2
        };
        let old = std::mem::replace(&mut self.slots, (0..new_capacity).map(|_| Slot::Empty).collect());
        self.count = 0;
        for slot in old {
            if let Slot::Occupied { key, value } = slot {
                let index = {
                    let mut i = key.hash() as usize % new_capacity;
                    loop {
                        match &self.slots[i] {
                            Slot::Empty => break i,
                            _ => i = (i + 1) % new_capacity,
                        }
                    }
                };
                self.slots[index] = Slot::Occupied { key, value };
                self.count += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Rc<VString> {
        Rc::new(VString::new(s))
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut table = GlobalTable::new();
        table.set(key("x"), Value::Number(1.0));
        assert!(matches!(table.get(&VString::new("x")), Some(Value::Number(n)) if n == 1.0));
        assert!(table.get(&VString::new("y")).is_none());
    }

    #[test]
    fn set_overwrites_existing_key() {
        let mut table = GlobalTable::new();
        table.set(key("x"), Value::Number(1.0));
        table.set(key("x"), Value::Number(2.0));
        assert_eq!(table.len(), 1);
        assert!(matches!(table.get(&VString::new("x")), Some(Value::Number(n)) if n == 2.0));
    }

    #[test]
    fn delete_tombstones_and_blocks_future_gets() {
        let mut table = GlobalTable::new();
        table.set(key("x"), Value::Number(1.0));
        assert!(table.delete(&VString::new("x")));
        assert!(table.get(&VString::new("x")).is_none());
        assert!(!table.delete(&VString::new("x")));
    }

    #[test]
    fn tombstone_does_not_block_probing_past_it() {
        let mut table = GlobalTable::new();
        // Force two keys that collide, delete the first, then confirm the
        // second is still reachable (probing must continue past a tombstone).
        table.set(key("a"), Value::Number(1.0));
        table.set(key("b"), Value::Number(2.0));
        table.set(key("c"), Value::Number(3.0));
        table.delete(&VString::new("a"));
        assert!(table.get(&VString::new("b")).is_some() || table.get(&VString::new("c")).is_some());
    }

    #[test]
    fn grows_past_load_factor_and_preserves_entries() {
        let mut table = GlobalTable::new();
        for i in 0..64 {
            table.set(key(&format!("g{i}")), Value::Number(i as f64));
        }
        assert_eq!(table.len(), 64);
        for i in 0..64 {
            let v = table.get(&VString::new(&format!("g{i}")));
            assert!(matches!(v, Some(Value::Number(n)) if n == i as f64));
        }
    }

    #[test]
    fn content_equal_keys_from_different_allocations_match() {
        // Distinct VString allocations with identical content must still
        // compare equal — the table does not rely on key interning.
        let mut table = GlobalTable::new();
        table.set(Rc::new(VString::new(String::from("abs"))), Value::Number(9.0));
        let probe = VString::new(String::from("abs"));
        assert!(matches!(table.get(&probe), Some(Value::Number(n)) if n == 9.0));
    }
}
