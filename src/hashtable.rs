//! Hashtable: open addressing with linear probing over allocator-backed storage.

use crate::allocator::{self, Allocator, HeapAllocator};
use crate::error::AllocError;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;
use hashbrown::hash_map::DefaultHashBuilder;

/// Slot count allocated by the first insert.
pub const INITIAL_CAPACITY: usize = 16;

// Key and value live in their own allocator blocks; the slot array only
// holds pointers to them plus the key's hash.
struct Entry<K, V> {
    hash: u64,
    key: NonNull<K>,
    value: NonNull<V>,
}

impl<K, V> Clone for Entry<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Entry<K, V> {}

type Slot<K, V> = Option<Entry<K, V>>;

enum Probe {
    Found(usize),
    Vacant(usize),
    // Went all the way around without finding the key or a free slot.
    Exhausted,
}

#[inline]
fn home(hash: u64, capacity: usize) -> usize {
    (hash % capacity as u64) as usize
}

#[inline]
fn next(idx: usize, capacity: usize) -> usize {
    if idx + 1 == capacity {
        0
    } else {
        idx + 1
    }
}

/// Open-addressing hashtable with linear probing whose slot array, keys and
/// values are allocated through `A`.
pub struct Hashtable<K, V, S = DefaultHashBuilder, A: Allocator = HeapAllocator> {
    // Dangling while `capacity == 0`.
    slots: NonNull<Slot<K, V>>,
    capacity: usize,
    len: usize,
    hasher: S,
    alloc: A,
    _owns: PhantomData<(K, V)>,
}

impl<K, V> Hashtable<K, V> {
    pub fn new() -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), HeapAllocator)
    }
}

impl<K, V, S> Hashtable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_in(hasher, HeapAllocator)
    }
}

impl<K, V, A: Allocator> Hashtable<K, V, DefaultHashBuilder, A> {
    pub fn new_in(alloc: A) -> Self {
        Self::with_hasher_in(DefaultHashBuilder::default(), alloc)
    }
}

impl<K, V, S, A> Default for Hashtable<K, V, S, A>
where
    S: Default,
    A: Allocator + Default,
{
    fn default() -> Self {
        Self::with_hasher_in(S::default(), A::default())
    }
}

impl<K, V, S, A: Allocator> Hashtable<K, V, S, A> {
    /// Create an empty table. Nothing is allocated until the first insert.
    pub fn with_hasher_in(hasher: S, alloc: A) -> Self {
        Self {
            slots: NonNull::dangling(),
            capacity: 0,
            len: 0,
            hasher,
            alloc,
            _owns: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots. Zero before the first insert, then a doubling of
    /// `INITIAL_CAPACITY`; never shrinks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    fn slots(&self) -> &[Slot<K, V>] {
        // SAFETY: `slots` points at `capacity` initialized slots, or is
        // dangling with `capacity == 0`.
        unsafe { core::slice::from_raw_parts(self.slots.as_ptr(), self.capacity) }
    }

    #[inline]
    fn slots_mut(&mut self) -> &mut [Slot<K, V>] {
        // SAFETY: as in `slots`, and `&mut self` is exclusive.
        unsafe { core::slice::from_raw_parts_mut(self.slots.as_ptr(), self.capacity) }
    }

    /// Iterate entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots().iter(),
            remaining: self.len,
        }
    }

    /// Iterate entries in slot order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.len;
        IterMut {
            slots: self.slots_mut().iter_mut(),
            remaining,
        }
    }

    /// Drop every entry and release its blocks. Capacity is kept.
    pub fn clear(&mut self) {
        for idx in 0..self.capacity {
            if let Some(entry) = self.slots_mut()[idx].take() {
                self.len -= 1;
                // SAFETY: the entry was just unlinked; its blocks are ours.
                unsafe {
                    allocator::drop_value(&self.alloc, entry.key);
                    allocator::drop_value(&self.alloc, entry.value);
                }
            }
        }
        debug_assert_eq!(self.len, 0);
    }

    // Move every entry into a slot array twice the size (or the initial
    // array on first use). Entries move by pointer with their cached hash,
    // so no user code runs and no entry blocks are reallocated.
    fn grow(&mut self) -> Result<(), AllocError> {
        let old_capacity = self.capacity;
        let new_capacity = if old_capacity == 0 {
            INITIAL_CAPACITY
        } else {
            old_capacity
                .checked_mul(2)
                .ok_or(AllocError::CapacityOverflow)?
        };
        let new_slots = match allocator::alloc_array::<Slot<K, V>, A>(&self.alloc, new_capacity) {
            Ok(p) => p,
            Err(e) => {
                #[cfg(feature = "logging")]
                log::warn!("hashtable: growth to {new_capacity} slots failed: {e}");
                return Err(e);
            }
        };
        for idx in 0..new_capacity {
            // SAFETY: idx < new_capacity, within the fresh array.
            unsafe { new_slots.as_ptr().add(idx).write(None) };
        }

        let old_slots = mem::replace(&mut self.slots, new_slots);
        self.capacity = new_capacity;
        for idx in 0..old_capacity {
            // SAFETY: idx < old_capacity; slots are Copy.
            if let Some(entry) = unsafe { old_slots.as_ptr().add(idx).read() } {
                self.place(entry);
            }
        }
        if old_capacity != 0 {
            // SAFETY: the old array came from `alloc_array` with this length.
            unsafe { allocator::release_array(&self.alloc, old_slots, old_capacity) };
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "hashtable: grew {old_capacity} -> {new_capacity} slots ({} entries)",
            self.len
        );
        Ok(())
    }

    // Put an entry into the first free slot of its probe sequence. Only used
    // while rebuilding, when keys are known to be distinct.
    fn place(&mut self, entry: Entry<K, V>) {
        let slots = self.slots_mut();
        let capacity = slots.len();
        let mut idx = home(entry.hash, capacity);
        while slots[idx].is_some() {
            idx = next(idx, capacity);
        }
        slots[idx] = Some(entry);
    }

    // Backward-shift deletion: after `hole` is emptied, pull later members of
    // the cluster back so every remaining entry stays reachable from its home
    // slot by an unbroken run of occupied slots.
    fn close_hole(&mut self, mut hole: usize) {
        let slots = self.slots_mut();
        let capacity = slots.len();
        let mut idx = next(hole, capacity);
        while let Some(entry) = slots[idx] {
            let ideal = home(entry.hash, capacity);
            let dist_to_idx = (idx + capacity - ideal) % capacity;
            let dist_to_hole = (hole + capacity - ideal) % capacity;
            if dist_to_hole <= dist_to_idx {
                slots[hole] = Some(entry);
                slots[idx] = None;
                hole = idx;
            }
            idx = next(idx, capacity);
        }
    }
}

impl<K, V, S, A> Hashtable<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: Allocator,
{
    fn probe<Q>(&self, hash: u64, q: &Q) -> Probe
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let slots = self.slots();
        let capacity = slots.len();
        if capacity == 0 {
            return Probe::Exhausted;
        }
        let start = home(hash, capacity);
        let mut idx = start;
        loop {
            match &slots[idx] {
                None => return Probe::Vacant(idx),
                Some(entry) if entry.hash == hash => {
                    // SAFETY: occupied slots point at live keys.
                    let key: &Q = unsafe { entry.key.as_ref() }.borrow();
                    if key == q {
                        return Probe::Found(idx);
                    }
                }
                Some(_) => {}
            }
            idx = next(idx, capacity);
            if idx == start {
                return Probe::Exhausted;
            }
        }
    }

    fn find_index<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        if self.len == 0 {
            return None;
        }
        match self.probe(self.hasher.hash_one(q), q) {
            Probe::Found(idx) => Some(idx),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Insert `key -> value`, or replace the value of an existing equal key
    /// (the stored key is kept) and return the old value.
    ///
    /// Grows first when the table is three quarters full. On error the table
    /// is unchanged and `key`/`value` are dropped.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, AllocError> {
        if self.len * 4 >= self.capacity * 3 {
            self.grow()?;
        }
        let hash = self.hasher.hash_one(&key);
        let idx = loop {
            match self.probe(hash, &key) {
                Probe::Found(idx) => match self.slots()[idx] {
                    Some(entry) => {
                        let mut slot_value = entry.value;
                        // SAFETY: live value block, uniquely reachable via &mut self.
                        let old = mem::replace(unsafe { slot_value.as_mut() }, value);
                        return Ok(Some(old));
                    }
                    None => break idx,
                },
                Probe::Vacant(idx) => break idx,
                // The load factor keeps a quarter of the slots free, so this
                // only happens if that invariant was broken.
                Probe::Exhausted => self.grow()?,
            }
        };

        let key_ptr = allocator::alloc_value(&self.alloc, key)?;
        let value_ptr = match allocator::alloc_value(&self.alloc, value) {
            Ok(p) => p,
            Err(e) => {
                // SAFETY: key_ptr was allocated just above and never linked.
                unsafe { allocator::drop_value(&self.alloc, key_ptr) };
                return Err(e);
            }
        };
        self.slots_mut()[idx] = Some(Entry {
            hash,
            key: key_ptr,
            value: value_ptr,
        });
        self.len += 1;
        Ok(None)
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.find_index(q)?;
        let entry = self.slots()[idx].as_ref()?;
        // SAFETY: live value block; the borrow is tied to &self.
        Some(unsafe { entry.value.as_ref() })
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.find_index(q)?;
        let entry = self.slots()[idx].as_ref()?;
        // SAFETY: live key and value blocks; the borrows are tied to &self.
        Some(unsafe { (entry.key.as_ref(), entry.value.as_ref()) })
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.find_index(q)?;
        let mut value = self.slots()[idx].as_ref()?.value;
        // SAFETY: live value block; the borrow is tied to &mut self.
        Some(unsafe { value.as_mut() })
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_index(q).is_some()
    }

    /// Remove a key, returning its value. Later entries of the same cluster
    /// are shifted back so they stay reachable.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let idx = self.find_index(q)?;
        let entry = self.slots_mut()[idx].take()?;
        self.len -= 1;
        self.close_hole(idx);
        // The structure is consistent again before any user Drop can run.
        // SAFETY: the entry is unlinked; its blocks are ours.
        unsafe {
            Some((
                allocator::take_value(&self.alloc, entry.key),
                allocator::take_value(&self.alloc, entry.value),
            ))
        }
    }
}

impl<K, V, S, A: Allocator> Drop for Hashtable<K, V, S, A> {
    fn drop(&mut self) {
        self.clear();
        if self.capacity != 0 {
            // SAFETY: the array came from `alloc_array` with this length.
            unsafe { allocator::release_array(&self.alloc, self.slots, self.capacity) };
        }
    }
}

impl<K, V, S, A> fmt::Debug for Hashtable<K, V, S, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over `(&K, &V)` in slot order.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(|s| *s)?;
        self.remaining -= 1;
        // SAFETY: occupied slots point at live blocks; the table is borrowed
        // for 'a.
        Some(unsafe { (entry.key.as_ref(), entry.value.as_ref()) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over `(&K, &mut V)` in slot order.
pub struct IterMut<'a, K, V> {
    slots: core::slice::IterMut<'a, Slot<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.slots.by_ref().find_map(|s| *s)?;
        self.remaining -= 1;
        // SAFETY: each value block is yielded once; the table is mutably
        // borrowed for 'a.
        Some(unsafe { (&*entry.key.as_ptr(), &mut *entry.value.as_ptr()) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a Hashtable<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: Allocator> IntoIterator for &'a mut Hashtable<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::testing::TrackingAllocator;
    use crate::arena::Arena;
    use core::hash::Hasher;
    use std::cell::Cell;
    use std::collections::BTreeSet;
    use std::rc::Rc;

    // Hashes integer keys to themselves so tests can pick home slots.
    #[derive(Clone, Copy, Default)]
    struct IdentityBuildHasher;
    #[derive(Default)]
    struct IdentityHasher(u64);
    impl BuildHasher for IdentityBuildHasher {
        type Hasher = IdentityHasher;
        fn build_hasher(&self) -> Self::Hasher {
            IdentityHasher(0)
        }
    }
    impl Hasher for IdentityHasher {
        fn write(&mut self, bytes: &[u8]) {
            for &b in bytes {
                self.0 = (self.0 << 8) | b as u64;
            }
        }
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0
        }
    }

    fn slot_of<S, A: Allocator>(t: &Hashtable<u64, &'static str, S, A>, k: u64) -> Option<usize> {
        t.slots()
            .iter()
            .position(|s| s.map(|e| unsafe { *e.key.as_ref() }) == Some(k))
    }

    /// Invariant: the most recent insert for a key wins, the old value is
    /// returned, and `len` only counts distinct keys.
    #[test]
    fn insert_replaces_and_counts_distinct_keys() {
        let mut t: Hashtable<String, i32> = Hashtable::new();
        assert_eq!(t.insert("a".to_string(), 1).unwrap(), None);
        assert_eq!(t.insert("b".to_string(), 2).unwrap(), None);
        assert_eq!(t.len(), 2);
        assert_eq!(t.insert("a".to_string(), 10).unwrap(), Some(1));
        assert_eq!(t.len(), 2);
        assert_eq!(t.get("a"), Some(&10));
        assert_eq!(t.get("b"), Some(&2));
        assert_eq!(t.get("c"), None);
    }

    /// Invariant: replacing a value keeps the originally stored key.
    #[test]
    fn replace_keeps_original_key() {
        #[derive(Debug, Clone)]
        struct Tagged(&'static str, u32);
        impl PartialEq for Tagged {
            fn eq(&self, o: &Self) -> bool {
                self.0 == o.0
            }
        }
        impl Eq for Tagged {}
        impl Hash for Tagged {
            fn hash<H: Hasher>(&self, h: &mut H) {
                self.0.hash(h)
            }
        }
        let mut t: Hashtable<Tagged, i32> = Hashtable::new();
        t.insert(Tagged("k", 1), 1).unwrap();
        t.insert(Tagged("k", 2), 2).unwrap();
        let (k, v) = t.get_key_value(&Tagged("k", 0)).unwrap();
        assert_eq!(k.1, 1);
        assert_eq!(*v, 2);
    }

    #[test]
    fn construction_does_not_allocate() {
        let alloc = TrackingAllocator::new();
        let t: Hashtable<u32, u32, DefaultHashBuilder, &TrackingAllocator> = Hashtable::new_in(&alloc);
        assert_eq!(t.capacity(), 0);
        assert!(t.is_empty());
        assert_eq!(t.get(&1), None);
        drop(t);
        assert_eq!(alloc.allocations(), 0);
    }

    /// Invariant: insert, remove, contains_key round trip; `len` drops by one.
    #[test]
    fn remove_round_trip() {
        let mut t: Hashtable<&str, i32> = Hashtable::new();
        t.insert("answer", 42).unwrap();
        assert!(t.contains_key("answer"));
        assert_eq!(t.remove("answer"), Some(42));
        assert!(!t.contains_key("answer"));
        assert_eq!(t.len(), 0);
        assert_eq!(t.remove("answer"), None);
    }

    /// Invariant: growth doubles capacity, starts at 16, and keeps the load
    /// below 3/4 after every insert.
    #[test]
    fn growth_doubles_from_initial_capacity() {
        let mut t: Hashtable<u64, u64> = Hashtable::new();
        let mut seen = vec![];
        for i in 0..100u64 {
            t.insert(i, i * 3).unwrap();
            if seen.last() != Some(&t.capacity()) {
                seen.push(t.capacity());
            }
            assert!(t.len() * 4 <= t.capacity() * 3);
        }
        assert_eq!(seen, vec![16, 32, 64, 128, 256]);
        for i in 0..100u64 {
            assert_eq!(t.get(&i), Some(&(i * 3)));
        }
    }

    /// Invariant: removing the middle of a collision chain keeps the tail
    /// reachable; the tail entry is shifted into the hole.
    #[test]
    fn removing_mid_chain_keeps_tail_reachable() {
        let mut t: Hashtable<u64, &str, IdentityBuildHasher> =
            Hashtable::with_hasher(IdentityBuildHasher);
        // All three share home slot 3 in a 16-slot table.
        for (k, v) in [(3u64, "k1"), (19, "k2"), (35, "k3")] {
            t.insert(k, v).unwrap();
        }
        assert_eq!(slot_of(&t, 3), Some(3));
        assert_eq!(slot_of(&t, 19), Some(4));
        assert_eq!(slot_of(&t, 35), Some(5));

        assert_eq!(t.remove(&19), Some("k2"));
        assert_eq!(t.get(&35), Some(&"k3"));
        assert_eq!(t.get(&3), Some(&"k1"));
        assert_eq!(slot_of(&t, 35), Some(4));
        assert!(t.slots()[5].is_none());
    }

    /// Invariant: entries whose home slot lies after the hole are not pulled
    /// in front of their home.
    #[test]
    fn backward_shift_respects_home_slots() {
        let mut t: Hashtable<u64, &str, IdentityBuildHasher> =
            Hashtable::with_hasher(IdentityBuildHasher);
        t.insert(2, "a").unwrap(); // slot 2
        t.insert(18, "b").unwrap(); // home 2 -> slot 3
        t.insert(4, "c").unwrap(); // slot 4, own home
        t.remove(&2).unwrap();
        assert_eq!(slot_of(&t, 18), Some(2));
        assert_eq!(slot_of(&t, 4), Some(4));
        assert_eq!(t.get(&4), Some(&"c"));
        assert_eq!(t.get(&18), Some(&"b"));
    }

    /// Invariant: backward shift follows clusters across the wrap-around
    /// from the last slot to slot 0.
    #[test]
    fn backward_shift_wraps_around() {
        let mut t: Hashtable<u64, &str, IdentityBuildHasher> =
            Hashtable::with_hasher(IdentityBuildHasher);
        t.insert(15, "a").unwrap(); // slot 15
        t.insert(31, "b").unwrap(); // home 15 -> slot 0
        t.insert(16, "c").unwrap(); // home 0 -> slot 1
        assert_eq!(slot_of(&t, 31), Some(0));
        assert_eq!(slot_of(&t, 16), Some(1));

        t.remove(&15).unwrap();
        assert_eq!(slot_of(&t, 31), Some(15));
        assert_eq!(slot_of(&t, 16), Some(0));
        assert_eq!(t.get(&31), Some(&"b"));
        assert_eq!(t.get(&16), Some(&"c"));
    }

    /// Invariant: a failed insert leaves no partial entry behind.
    #[test]
    fn failed_value_allocation_rolls_back_key() {
        let alloc = TrackingAllocator::new();
        let mut t: Hashtable<u64, u64, DefaultHashBuilder, &TrackingAllocator> =
            Hashtable::new_in(&alloc);
        // slot array + key succeed, value block fails
        alloc.fail_after(2);
        assert!(matches!(t.insert(1, 1), Err(AllocError::OutOfMemory { .. })));
        assert_eq!(t.len(), 0);
        assert!(!t.contains_key(&1));
        assert_eq!(alloc.live(), 1);

        alloc.unlimited();
        assert_eq!(t.insert(1, 1).unwrap(), None);
        assert_eq!(t.get(&1), Some(&1));
    }

    /// Invariant: failed growth leaves the table exactly as it was.
    #[test]
    fn failed_growth_leaves_table_intact() {
        let alloc = TrackingAllocator::new();
        let mut t: Hashtable<u64, u64, DefaultHashBuilder, &TrackingAllocator> =
            Hashtable::new_in(&alloc);
        for i in 0..12 {
            t.insert(i, i).unwrap();
        }
        assert_eq!(t.capacity(), 16);
        alloc.fail_after(0);
        assert!(t.insert(100, 100).is_err());
        assert_eq!(t.capacity(), 16);
        assert_eq!(t.len(), 12);
        for i in 0..12 {
            assert_eq!(t.get(&i), Some(&i));
        }
        // Updating an existing key never allocates, but the growth check
        // still runs first.
        assert!(t.insert(0, 7).is_err());
        alloc.unlimited();
        assert_eq!(t.insert(0, 7).unwrap(), Some(0));
        assert_eq!(t.capacity(), 32);
    }

    /// Invariant: every block handed out is released by remove, clear and drop.
    #[test]
    fn all_blocks_are_released() {
        let alloc = TrackingAllocator::new();
        {
            let mut t: Hashtable<String, Vec<u8>, DefaultHashBuilder, &TrackingAllocator> =
                Hashtable::new_in(&alloc);
            for i in 0..40 {
                t.insert(format!("k{i}"), vec![i as u8]).unwrap();
            }
            t.remove("k3").unwrap();
            t.clear();
            assert!(t.is_empty());
            // slot array only
            assert_eq!(alloc.live(), 1);
            for i in 0..5 {
                t.insert(format!("again{i}"), vec![]).unwrap();
            }
        }
        assert_eq!(alloc.live(), 0);
        assert_eq!(alloc.allocations(), alloc.releases());
    }

    /// Invariant: values are dropped exactly once, whether removed, replaced,
    /// cleared or dropped with the table.
    #[test]
    fn values_drop_exactly_once() {
        let drops = Rc::new(Cell::new(0));
        struct D(Rc<Cell<usize>>);
        impl Drop for D {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }
        let mut t: Hashtable<u32, D> = Hashtable::new();
        for i in 0..30 {
            t.insert(i, D(drops.clone())).unwrap();
        }
        let old = t.insert(0, D(drops.clone())).unwrap();
        drop(old);
        assert_eq!(drops.get(), 1);
        drop(t.remove(&1));
        assert_eq!(drops.get(), 2);
        drop(t);
        assert_eq!(drops.get(), 31);
    }

    #[test]
    fn zero_sized_values() {
        let mut t: Hashtable<u32, ()> = Hashtable::new();
        for i in 0..20 {
            t.insert(i, ()).unwrap();
        }
        assert_eq!(t.insert(3, ()).unwrap(), Some(()));
        assert_eq!(t.len(), 20);
        assert_eq!(t.remove(&3), Some(()));
        assert!(!t.contains_key(&3));
    }

    /// Invariant: iteration yields each live entry once; `iter_mut` updates
    /// are visible to lookups.
    #[test]
    fn iteration_and_mutation() {
        let mut t: Hashtable<String, i32> = Hashtable::new();
        for (i, k) in ["k1", "k2", "k3"].iter().enumerate() {
            t.insert((*k).to_string(), i as i32).unwrap();
        }
        let it = t.iter();
        assert_eq!(it.len(), 3);
        let seen: BTreeSet<String> = it.map(|(k, _)| k.clone()).collect();
        assert_eq!(seen.len(), 3);

        for (_, v) in t.iter_mut() {
            *v += 10;
        }
        assert_eq!(t.get("k1"), Some(&10));
        assert_eq!(t.get("k3"), Some(&12));

        if let Some(v) = t.get_mut("k2") {
            *v = -1;
        }
        let total: i32 = (&t).into_iter().map(|(_, v)| *v).sum();
        assert_eq!(total, 10 - 1 + 12);
    }

    /// Invariant: with an arena behind the table, removal releases nothing
    /// and growth draws on the arena.
    #[test]
    fn arena_backed_table() {
        let arena = Arena::new(1024).unwrap();
        {
            let mut t: Hashtable<u64, u64, DefaultHashBuilder, &Arena> = Hashtable::new_in(&arena);
            t.insert(1, 1).unwrap();
            let used = arena.used_bytes();
            assert!(used > 0);
            t.remove(&1).unwrap();
            assert_eq!(arena.used_bytes(), used);
            for i in 0..50 {
                t.insert(i, i).unwrap();
            }
            assert!(arena.chunk_count() > 1);
            assert_eq!(t.get(&49), Some(&49));
        }
        let mut arena = arena;
        arena.reset();
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn debug_lists_entries() {
        let mut t: Hashtable<u64, u64, IdentityBuildHasher> = Hashtable::with_hasher(IdentityBuildHasher);
        t.insert(2, 20).unwrap();
        t.insert(1, 10).unwrap();
        assert_eq!(format!("{t:?}"), "{1: 10, 2: 20}");
    }
}
