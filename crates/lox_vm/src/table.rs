use crate::value::ObjRef;

const MAX_LOAD: f64 = 0.75;

enum Slot<V> {
    Empty,
    Tombstone,
    Occupied(ObjRef, u32, V),
}

/// Open-addressing hash table with linear probing and tombstone deletion,
/// keyed by interned string references. Used for globals, instance fields,
/// and class method tables — anywhere clox reaches for its `Table`.
///
/// Interning means `ObjRef` equality already implies string equality, so the
/// stored hash (computed once at intern time) is what drives probing; we
/// never need to re-hash the string's bytes here.
pub struct Table<V> {
    entries: Vec<Slot<V>>,
    count: usize, // live entries + tombstones, mirrors clox's growth trigger
}

impl<V: Clone> Default for Table<V> {
    fn default() -> Self {
        Table { entries: Vec::new(), count: 0 }
    }
}

impl<V: Clone> Table<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|s| matches!(s, Slot::Occupied(..)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: ObjRef, hash: u32) -> Option<&V> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.find_slot(key, hash);
        match &self.entries[idx] {
            Slot::Occupied(_, _, v) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, key: ObjRef, hash: u32) -> Option<&mut V> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self.find_slot(key, hash);
        match &mut self.entries[idx] {
            Slot::Occupied(_, _, v) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, key: ObjRef, hash: u32) -> bool {
        self.get(key, hash).is_some()
    }

    /// Inserts `value` under `key`, returning `true` if this created a brand
    /// new entry (as opposed to overwriting an existing one).
    pub fn set(&mut self, key: ObjRef, hash: u32, value: V) -> bool {
        if self.entries.is_empty() || (self.count + 1) as f64 > self.entries.len() as f64 * MAX_LOAD {
            self.grow();
        }
        let idx = self.find_slot(key, hash);
        let is_new = !matches!(self.entries[idx], Slot::Occupied(..));
        if is_new && !matches!(self.entries[idx], Slot::Tombstone) {
            self.count += 1;
        }
        self.entries[idx] = Slot::Occupied(key, hash, value);
        is_new
    }

    pub fn delete(&mut self, key: ObjRef, hash: u32) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let idx = self.find_slot(key, hash);
        if matches!(self.entries[idx], Slot::Occupied(..)) {
            self.entries[idx] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, &V)> {
        self.entries.iter().filter_map(|s| match s {
            Slot::Occupied(k, _, v) => Some((*k, v)),
            _ => None,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjRef, &mut V)> {
        self.entries.iter_mut().filter_map(|s| match s {
            Slot::Occupied(k, _, v) => Some((*k, v)),
            _ => None,
        })
    }

    fn find_slot(&self, key: ObjRef, hash: u32) -> usize {
        let cap = self.entries.len();
        let mut idx = hash as usize % cap;
        let mut first_tombstone: Option<usize> = None;
        loop {
            match &self.entries[idx] {
                Slot::Empty => return first_tombstone.unwrap_or(idx),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(idx);
                    }
                }
                Slot::Occupied(k, h, _) => {
                    if *h == hash && *k == key {
                        return idx;
                    }
                }
            }
            idx = (idx + 1) % cap;
        }
    }

    fn grow(&mut self) {
        let new_cap = if self.entries.is_empty() { 8 } else { self.entries.len() * 2 };
        let old = std::mem::replace(&mut self.entries, (0..new_cap).map(|_| Slot::Empty).collect());
        self.count = 0;
        for slot in old {
            if let Slot::Occupied(k, h, v) = slot {
                let idx = self.find_slot(k, h);
                self.entries[idx] = Slot::Occupied(k, h, v);
                self.count += 1;
            }
        }
    }
}

/// FNV-1a, matching clox's `hashString` — cheap, deterministic, and good
/// enough for identifier-shaped keys.
pub fn hash_str(s: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in s.as_bytes() {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_roundtrip() {
        let mut t: Table<i64> = Table::new();
        let k = ObjRef(1);
        let h = hash_str("x");
        assert!(t.set(k, h, 42));
        assert_eq!(t.get(k, h), Some(&42));
    }

    #[test]
    fn overwrite_returns_false() {
        let mut t: Table<i64> = Table::new();
        let k = ObjRef(1);
        let h = hash_str("x");
        assert!(t.set(k, h, 1));
        assert!(!t.set(k, h, 2));
        assert_eq!(t.get(k, h), Some(&2));
    }

    #[test]
    fn delete_then_reinsert() {
        let mut t: Table<i64> = Table::new();
        let k = ObjRef(1);
        let h = hash_str("x");
        t.set(k, h, 1);
        assert!(t.delete(k, h));
        assert_eq!(t.get(k, h), None);
        assert!(t.set(k, h, 2));
        assert_eq!(t.get(k, h), Some(&2));
    }

    #[test]
    fn grows_past_load_factor() {
        let mut t: Table<i64> = Table::new();
        for i in 0..100 {
            t.set(ObjRef(i), i as u32, i as i64);
        }
        for i in 0..100 {
            assert_eq!(t.get(ObjRef(i), i as u32), Some(&(i as i64)));
        }
    }
}
