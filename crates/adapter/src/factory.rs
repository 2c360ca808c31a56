use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::key::{Adaptable, TypeKey};

/// Produces capability views of adaptable instances.
pub trait AdapterFactory: Send + Sync {
	/// Source type this factory is registered for.
	fn adaptable_type(&self) -> TypeKey;

	/// Capability types this factory can produce.
	fn adapter_types(&self) -> &[TypeKey];

	/// Builds the `capability` view of `instance`.
	///
	/// `instance` may be of any type whose declared supertypes lead to
	/// [`AdapterFactory::adaptable_type`]. The returned value must be of the
	/// capability type or the registry discards it.
	fn adapt(&self, instance: &Arc<dyn Adaptable>, capability: TypeKey) -> Option<Arc<dyn Any + Send + Sync>>;
}

pub type FactoryRef = Arc<dyn AdapterFactory>;

/// Same allocation, regardless of vtable.
pub(crate) fn same_factory(a: &FactoryRef, b: &FactoryRef) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

type AdaptFn = dyn Fn(&Arc<dyn Adaptable>) -> Option<Arc<dyn Any + Send + Sync>> + Send + Sync;

/// Closure-backed factory producing a single capability.
pub struct FnFactory {
	source: TypeKey,
	targets: [TypeKey; 1],
	adapt: Box<AdaptFn>,
}

impl FnFactory {
	/// Factory for source `S` producing capability `C` from any instance.
	pub fn new<S, C, F>(f: F) -> Self
	where
		S: ?Sized + 'static,
		C: Any + Send + Sync,
		F: Fn(&Arc<dyn Adaptable>) -> Option<C> + Send + Sync + 'static,
	{
		Self {
			source: TypeKey::of::<S>(),
			targets: [TypeKey::of::<C>()],
			adapt: Box::new(move |instance: &Arc<dyn Adaptable>| {
				f(instance).map(|c| Arc::new(c) as Arc<dyn Any + Send + Sync>)
			}),
		}
	}

	/// Factory for concrete source `S`; instances of other types yield nothing.
	pub fn typed<S, C, F>(f: F) -> Self
	where
		S: Any,
		C: Any + Send + Sync,
		F: Fn(&S) -> C + Send + Sync + 'static,
	{
		Self::new::<S, C, _>(move |instance| instance.as_any().downcast_ref::<S>().map(&f))
	}
}

impl AdapterFactory for FnFactory {
	fn adaptable_type(&self) -> TypeKey {
		self.source
	}

	fn adapter_types(&self) -> &[TypeKey] {
		&self.targets
	}

	fn adapt(&self, instance: &Arc<dyn Adaptable>, capability: TypeKey) -> Option<Arc<dyn Any + Send + Sync>> {
		if capability != self.targets[0] {
			return None;
		}
		(self.adapt)(instance)
	}
}

impl fmt::Debug for FnFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FnFactory")
			.field("source", &self.source)
			.field("target", &self.targets[0])
			.finish()
	}
}
