#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::factory::{AdapterFactory, FactoryRef};
use crate::key::{Adaptable, TypeKey};
use crate::registry::{AdapterRegistry, MemoPolicy};

struct Leaf;
struct Mid;
struct Base;

#[derive(Debug)]
struct View(&'static str);

crate::adaptable!(Leaf);

struct TaggedFactory {
	source: TypeKey,
	targets: [TypeKey; 1],
	tag: &'static str,
	calls: AtomicUsize,
}

fn tagged<S: 'static>(tag: &'static str) -> Arc<TaggedFactory> {
	Arc::new(TaggedFactory {
		source: TypeKey::of::<S>(),
		targets: [TypeKey::of::<View>()],
		tag,
		calls: AtomicUsize::new(0),
	})
}

impl AdapterFactory for TaggedFactory {
	fn adaptable_type(&self) -> TypeKey {
		self.source
	}

	fn adapter_types(&self) -> &[TypeKey] {
		&self.targets
	}

	fn adapt(&self, _instance: &Arc<dyn Adaptable>, _capability: TypeKey) -> Option<Arc<dyn Any + Send + Sync>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Some(Arc::new(View(self.tag)))
	}
}

fn leaf_mid_base(policy: MemoPolicy) -> AdapterRegistry {
	let registry = AdapterRegistry::with_policy(policy);
	registry.declare_type(TypeKey::of::<Leaf>(), [TypeKey::of::<Mid>()]);
	registry.declare_type(TypeKey::of::<Mid>(), [TypeKey::of::<Base>()]);
	registry
}

/// Invariant: with `Retain`, a memoized broader factory hides a later, more specific one.
pub(crate) fn inv_retained_memo_is_stale() {
	let registry = leaf_mid_base(MemoPolicy::Retain);
	let leaf: Arc<dyn Adaptable> = Arc::new(Leaf);

	registry.register_factory(tagged::<Base>("base"));
	assert_eq!(registry.adapt::<View>(&leaf).unwrap().0, "base");

	registry.register_factory(tagged::<Mid>("mid"));
	assert_eq!(registry.adapt::<View>(&leaf).unwrap().0, "base");
}

#[cfg_attr(test, test)]
pub(crate) fn test_retained_memo_is_stale() {
	inv_retained_memo_is_stale()
}

/// Invariant: with `InvalidateOnRegister`, later registrations are seen by descendants.
pub(crate) fn inv_invalidating_memo_sees_new_factory() {
	let registry = leaf_mid_base(MemoPolicy::InvalidateOnRegister);
	let leaf: Arc<dyn Adaptable> = Arc::new(Leaf);

	registry.register_factory(tagged::<Base>("base"));
	assert_eq!(registry.adapt::<View>(&leaf).unwrap().0, "base");

	registry.register_factory(tagged::<Mid>("mid"));
	assert_eq!(registry.adapt::<View>(&leaf).unwrap().0, "mid");
}

#[cfg_attr(test, test)]
pub(crate) fn test_invalidating_memo_sees_new_factory() {
	inv_invalidating_memo_sees_new_factory()
}

/// Invariant: concurrent first-time lookups agree on one factory and memoize it.
pub(crate) fn inv_concurrent_first_resolution() {
	let registry = leaf_mid_base(MemoPolicy::Retain);
	let base = tagged::<Base>("base");
	let expected: FactoryRef = base.clone();
	registry.register_factory(base);

	thread::scope(|s| {
		for _ in 0..8 {
			s.spawn(|| {
				for _ in 0..50 {
					let found = registry
						.find_factory(TypeKey::of::<Leaf>(), TypeKey::of::<View>())
						.expect("factory resolves");
					assert!(std::ptr::addr_eq(Arc::as_ptr(&found), Arc::as_ptr(&expected)));
				}
			});
		}
	});

	let stats = registry.stats();
	assert_eq!(stats.memo_hits + stats.walks, 400);
	assert!(stats.walks >= 1);
	let descriptor = registry.descriptor(TypeKey::of::<Leaf>()).expect("leaf descriptor");
	assert!(descriptor.memo(TypeKey::of::<View>()).is_some());
}

#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_first_resolution() {
	inv_concurrent_first_resolution()
}
