//! arena-hashtable: a single-threaded open-addressing hashtable whose
//! storage comes from a pluggable allocator, plus a chunked bump arena to
//! run it on.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a hashtable whose memory behaviour is explicit. Every block it
//!   owns (the slot array, each key, each value) is obtained from and given
//!   back to an `Allocator` the caller chooses.
//! - Layers:
//!   - `Allocator`: two operations, `allocate(layout)` and
//!     `release(ptr, layout)`. `HeapAllocator` frees for real; `Arena`
//!     ignores `release` and reclaims only on `reset` or drop.
//!   - `Arena`: a chain of chunks serving linear allocations, newest chunk
//!     first, growing by `max(request, chunk_size)`.
//!   - `Hashtable<K, V, S, A>`: slot array with linear probing, doubling at
//!     a 3/4 load factor, backward-shift deletion.
//!
//! Constraints
//! - Single-threaded: the table and the arena are `!Send`/`!Sync` (raw
//!   pointers, `RefCell`); callers needing sharing must lock externally.
//! - Keys and values are fixed-size Rust types; each lives in its own
//!   allocator block, so slot moves during growth or deletion never move
//!   key or value bytes.
//! - A table borrowing an arena (`A = &Arena`) cannot outlive it, and the
//!   arena cannot be reset while the table exists: `reset` takes
//!   `&mut self`.
//!
//! Hashing and probing
//! - Each entry caches the `u64` hash of its key. Growth and deletion use
//!   the cached hash, so `K: Hash` runs once per insert and lookup and never
//!   while the slot array is being rearranged.
//! - Probing starts at `hash % capacity` and walks forward, wrapping at the
//!   end; it stops at an empty slot, an equal key, or after one full lap.
//!
//! Deletion
//! - Removing an entry empties its slot and then shifts later members of
//!   the same cluster back into the hole when their home slot allows it.
//!   Every remaining key stays reachable from its home slot by an unbroken
//!   run of occupied slots; there are no tombstones.
//!
//! Growth
//! - Construction allocates nothing. The first insert allocates
//!   `INITIAL_CAPACITY` slots; each later growth doubles the slot array and
//!   re-places entries by their cached hash. Capacity never shrinks.
//! - Allocation failure is reported as `AllocError` and leaves the table as
//!   it was before the call.
//!
//! Iteration
//! - `iter`/`iter_mut` borrow the table, so mutation during iteration does
//!   not compile. Order is slot order, not insertion order.
//!
//! Logging
//! - With the `logging` feature (on by default) the crate emits `log`
//!   records for arena chunk creation and resets, table growth, and
//!   allocation failures.

mod allocator;
pub mod arena;
mod error;
pub mod hashtable;
mod hashtable_proptest;
pub mod str_hash;

// Public surface
pub use allocator::{Allocator, HeapAllocator};
pub use arena::{Arena, DEFAULT_CHUNK_SIZE};
pub use error::AllocError;
pub use hashtable::{Hashtable, Iter, IterMut, INITIAL_CAPACITY};
pub use str_hash::{hash_str, table_hash_str, Djb2Hasher, StrBuildHasher};
