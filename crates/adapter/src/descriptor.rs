//! Per-type descriptor: declared supertypes plus the factory memo.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;

use crate::factory::{FactoryRef, same_factory};
use crate::key::TypeKey;

type FactoryMap = FxHashMap<TypeKey, FactoryRef>;

/// Registry record for one source type.
///
/// `registered` holds factories registered directly for this type.
/// `resolved` holds everything the type can currently answer without a walk:
/// the direct registrations plus factories memoized from supertypes.
pub struct TypeDescriptor {
	key: TypeKey,
	supertypes: ArcSwap<Vec<TypeKey>>,
	registered: ArcSwap<FactoryMap>,
	resolved: ArcSwap<FactoryMap>,
}

impl TypeDescriptor {
	pub(crate) fn new(key: TypeKey) -> Self {
		Self {
			key,
			supertypes: ArcSwap::from_pointee(Vec::new()),
			registered: ArcSwap::from_pointee(FactoryMap::default()),
			resolved: ArcSwap::from_pointee(FactoryMap::default()),
		}
	}

	pub fn key(&self) -> TypeKey {
		self.key
	}

	/// Directly declared supertypes in declaration order.
	pub fn supertypes(&self) -> Arc<Vec<TypeKey>> {
		self.supertypes.load_full()
	}

	/// Lock-free memo read.
	pub fn memo(&self, capability: TypeKey) -> Option<FactoryRef> {
		self.resolved.load().get(&capability).cloned()
	}

	/// Number of capabilities currently answerable without a walk.
	pub fn memo_len(&self) -> usize {
		self.resolved.load().len()
	}

	// Mutators below require the registry write lock.

	pub(crate) fn set_supertypes(&self, supertypes: Vec<TypeKey>) {
		self.supertypes.store(Arc::new(supertypes));
	}

	pub(crate) fn memoize(&self, capability: TypeKey, factory: FactoryRef) {
		let mut next = FactoryMap::clone(&self.resolved.load());
		next.insert(capability, factory);
		self.resolved.store(Arc::new(next));
	}

	pub(crate) fn register(&self, capability: TypeKey, factory: FactoryRef) {
		let mut next = FactoryMap::clone(&self.registered.load());
		next.insert(capability, factory.clone());
		self.registered.store(Arc::new(next));
		self.memoize(capability, factory);
	}

	/// Drops every memoized entry that was not registered directly.
	pub(crate) fn reset_memo(&self) {
		self.resolved.store(self.registered.load_full());
	}

	/// Removes `factory` from both maps. Returns true if it was registered here.
	pub(crate) fn forget(&self, factory: &FactoryRef) -> bool {
		let registered = self.registered.load();
		let had = registered.values().any(|f| same_factory(f, factory));
		if had {
			let mut next = FactoryMap::clone(&registered);
			next.retain(|_, f| !same_factory(f, factory));
			self.registered.store(Arc::new(next));
		}
		let resolved = self.resolved.load();
		if resolved.values().any(|f| same_factory(f, factory)) {
			let mut next = FactoryMap::clone(&resolved);
			next.retain(|_, f| !same_factory(f, factory));
			self.resolved.store(Arc::new(next));
		}
		had
	}
}

impl std::fmt::Debug for TypeDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TypeDescriptor")
			.field("key", &self.key)
			.field("supertypes", &*self.supertypes.load())
			.field("memo", &self.resolved.load().keys().collect::<Vec<_>>())
			.finish()
	}
}
