//! Copy-on-write children list.
//!
//! # Role
//!
//! Holds the ordered, mutable list of child scopes together with a lazily
//! built immutable snapshot of it. Readers take the snapshot without locking;
//! writers mutate the list under the lock and invalidate the snapshot.
//!
//! # Invariants
//!
//! - The published snapshot is either absent or an exact, order-preserving copy
//!   of the list at some past instant (see `invariants::test_snapshot_never_torn`).
//! - Invalidation and rebuild both happen under the list lock, so a rebuild
//!   can never publish a copy that predates a completed mutation.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::scope::{ScopeRef, same_scope};

/// Immutable point-in-time view of a resolver's children.
pub struct ChildrenSnapshot {
	scopes: Box<[ScopeRef]>,
}

impl ChildrenSnapshot {
	pub fn iter(&self) -> std::slice::Iter<'_, ScopeRef> {
		self.scopes.iter()
	}

	/// Returns the scope labels in order.
	pub fn labels(&self) -> Vec<&str> {
		self.scopes.iter().map(|s| s.label()).collect()
	}
}

impl Deref for ChildrenSnapshot {
	type Target = [ScopeRef];

	fn deref(&self) -> &[ScopeRef] {
		&self.scopes
	}
}

impl<'a> IntoIterator for &'a ChildrenSnapshot {
	type Item = &'a ScopeRef;
	type IntoIter = std::slice::Iter<'a, ScopeRef>;

	fn into_iter(self) -> Self::IntoIter {
		self.scopes.iter()
	}
}

impl std::fmt::Debug for ChildrenSnapshot {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.labels()).finish()
	}
}

/// Ordered child list with a lazily published snapshot.
pub(crate) struct ChildList {
	entries: Mutex<Vec<ScopeRef>>,
	snap: ArcSwapOption<ChildrenSnapshot>,
	rebuilds: AtomicU64,
}

impl ChildList {
	pub(crate) fn new() -> Self {
		Self {
			entries: Mutex::new(Vec::new()),
			snap: ArcSwapOption::empty(),
			rebuilds: AtomicU64::new(0),
		}
	}

	/// Appends a scope. Duplicates are kept.
	pub(crate) fn push(&self, scope: ScopeRef) -> usize {
		let mut entries = self.entries.lock();
		entries.push(scope);
		self.snap.store(None);
		entries.len()
	}

	/// Removes the first entry that is the same allocation as `scope`.
	pub(crate) fn remove(&self, scope: &ScopeRef) -> bool {
		let mut entries = self.entries.lock();
		let Some(idx) = entries.iter().position(|s| same_scope(s, scope)) else {
			return false;
		};
		entries.remove(idx);
		self.snap.store(None);
		true
	}

	/// Removes every entry and returns how many there were.
	pub(crate) fn clear(&self) -> usize {
		let mut entries = self.entries.lock();
		let removed = entries.len();
		entries.clear();
		self.snap.store(None);
		removed
	}

	/// Returns the current snapshot, building it if it was invalidated.
	pub(crate) fn snapshot(&self) -> Arc<ChildrenSnapshot> {
		if let Some(snap) = self.snap.load_full() {
			return snap;
		}
		let entries = self.entries.lock();
		// Another reader may have rebuilt while we waited for the lock.
		if let Some(snap) = self.snap.load_full() {
			return snap;
		}
		let snap = Arc::new(ChildrenSnapshot {
			scopes: entries.iter().cloned().collect(),
		});
		self.snap.store(Some(Arc::clone(&snap)));
		self.rebuilds.fetch_add(1, Ordering::Relaxed);
		snap
	}

	/// Number of snapshot rebuilds so far.
	pub(crate) fn rebuilds(&self) -> u64 {
		self.rebuilds.load(Ordering::Relaxed)
	}
}
