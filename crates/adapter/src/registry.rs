//! Adapter registry with memoized supertype resolution.
//!
//! # Invariants
//!
//! - A memo hit never takes the write lock.
//! - Once `(type, capability)` resolves, the factory is memoized on that
//!   type's descriptor. Under [`MemoPolicy::Retain`] later registrations do
//!   not revisit it (see `invariants::test_retained_memo_is_stale`).
//! - Supertype walks visit each type at most once per lookup, so a cyclic
//!   declaration terminates.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::descriptor::TypeDescriptor;
use crate::factory::FactoryRef;
use crate::key::{Adaptable, TypeKey};

/// What registration does to factories already memoized on other types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoPolicy {
	/// Keep memoized results. A more specific factory registered after a
	/// descendant memoized a broader one stays invisible to that descendant.
	#[default]
	Retain,
	/// Drop every memoized (non-direct) result on each registration or
	/// unregistration so the next lookup walks again.
	InvalidateOnRegister,
}

/// Lookup counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterStats {
	/// Lookups answered by the lock-free memo read.
	pub memo_hits: u64,
	/// Lookups that took the write lock and walked supertypes.
	pub walks: u64,
}

type DescriptorMap = FxHashMap<TypeKey, Arc<TypeDescriptor>>;

/// Registry mapping (source type, capability) to an adapter factory.
pub struct AdapterRegistry {
	descriptors: ArcSwap<DescriptorMap>,
	write: Mutex<()>,
	policy: MemoPolicy,
	memo_hits: AtomicU64,
	walks: AtomicU64,
}

impl Default for AdapterRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl AdapterRegistry {
	pub fn new() -> Self {
		Self::with_policy(MemoPolicy::default())
	}

	pub fn with_policy(policy: MemoPolicy) -> Self {
		Self {
			descriptors: ArcSwap::from_pointee(DescriptorMap::default()),
			write: Mutex::new(()),
			policy,
			memo_hits: AtomicU64::new(0),
			walks: AtomicU64::new(0),
		}
	}

	pub fn policy(&self) -> MemoPolicy {
		self.policy
	}

	pub fn stats(&self) -> AdapterStats {
		AdapterStats {
			memo_hits: self.memo_hits.load(Ordering::Relaxed),
			walks: self.walks.load(Ordering::Relaxed),
		}
	}

	/// Returns the descriptor for `ty`, if one exists yet.
	pub fn descriptor(&self, ty: TypeKey) -> Option<Arc<TypeDescriptor>> {
		self.descriptors.load().get(&ty).cloned()
	}

	/// Declares the direct supertypes of `ty`, in lookup order.
	///
	/// Replaces any earlier declaration. Memoized results are left alone.
	pub fn declare_type(&self, ty: TypeKey, supertypes: impl IntoIterator<Item = TypeKey>) {
		let _guard = self.write.lock();
		let supertypes: Vec<TypeKey> = supertypes.into_iter().collect();
		debug!(%ty, supertypes = supertypes.len(), "type declared");
		self.descriptor_locked(ty).set_supertypes(supertypes);
	}

	/// Registers `factory` for each capability it declares.
	///
	/// A registration for a type that already has a factory for the same
	/// capability replaces it on that type.
	pub fn register_factory(&self, factory: FactoryRef) {
		let _guard = self.write.lock();
		let source = factory.adaptable_type();
		let descriptor = self.descriptor_locked(source);
		for capability in factory.adapter_types() {
			descriptor.register(*capability, Arc::clone(&factory));
		}
		debug!(%source, capabilities = factory.adapter_types().len(), "adapter factory registered");
		if self.policy == MemoPolicy::InvalidateOnRegister {
			self.reset_memos_locked();
		}
	}

	/// Removes `factory` everywhere it is registered or memoized.
	///
	/// Returns false if it was never registered.
	pub fn unregister_factory(&self, factory: &FactoryRef) -> bool {
		let _guard = self.write.lock();
		let mut removed = false;
		for descriptor in self.descriptors.load().values() {
			removed |= descriptor.forget(factory);
		}
		if removed && self.policy == MemoPolicy::InvalidateOnRegister {
			self.reset_memos_locked();
		}
		debug!(source = %factory.adaptable_type(), removed, "adapter factory unregistered");
		removed
	}

	/// Finds the factory adapting `ty` to `capability`.
	pub fn find_factory(&self, ty: TypeKey, capability: TypeKey) -> Option<FactoryRef> {
		if let Some(descriptor) = self.descriptors.load().get(&ty)
			&& let Some(factory) = descriptor.memo(capability)
		{
			self.memo_hits.fetch_add(1, Ordering::Relaxed);
			return Some(factory);
		}
		let _guard = self.write.lock();
		self.walks.fetch_add(1, Ordering::Relaxed);
		let mut visited = FxHashSet::default();
		self.find_locked(ty, capability, &mut visited)
	}

	/// Finds the factory for `instance`'s own type.
	pub fn factory_for(&self, instance: &Arc<dyn Adaptable>, capability: TypeKey) -> Option<FactoryRef> {
		self.find_factory(instance.type_key(), capability)
	}

	/// Adapts `instance` to capability `C`.
	///
	/// With no factory, `instance` itself is returned when it already is a `C`.
	/// `None` is the ordinary "not adaptable" answer.
	pub fn adapt<C: Any + Send + Sync>(&self, instance: &Arc<dyn Adaptable>) -> Option<Arc<C>> {
		let capability = TypeKey::of::<C>();
		match self.factory_for(instance, capability) {
			Some(factory) => {
				let adapted = factory.adapt(instance, capability)?;
				match adapted.downcast::<C>() {
					Ok(view) => Some(view),
					Err(_) => {
						warn!(
							source = %instance.type_key(),
							%capability,
							"adapter factory returned a value of the wrong type"
						);
						None
					}
				}
			}
			None => Arc::clone(instance).into_any().downcast::<C>().ok(),
		}
	}

	fn descriptor_locked(&self, ty: TypeKey) -> Arc<TypeDescriptor> {
		let current = self.descriptors.load();
		if let Some(descriptor) = current.get(&ty) {
			return Arc::clone(descriptor);
		}
		let descriptor = Arc::new(TypeDescriptor::new(ty));
		let mut next = DescriptorMap::clone(&current);
		next.insert(ty, Arc::clone(&descriptor));
		self.descriptors.store(Arc::new(next));
		descriptor
	}

	fn find_locked(&self, ty: TypeKey, capability: TypeKey, visited: &mut FxHashSet<TypeKey>) -> Option<FactoryRef> {
		if !visited.insert(ty) {
			return None;
		}
		let descriptor = self.descriptor_locked(ty);
		if let Some(factory) = descriptor.memo(capability) {
			return Some(factory);
		}
		for supertype in descriptor.supertypes().iter() {
			if let Some(factory) = self.find_locked(*supertype, capability, visited) {
				descriptor.memoize(capability, Arc::clone(&factory));
				return Some(factory);
			}
		}
		None
	}

	fn reset_memos_locked(&self) {
		for descriptor in self.descriptors.load().values() {
			descriptor.reset_memo();
		}
	}
}
