use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a source or capability type.
///
/// Equality and hashing use the [`TypeId`] only; the name is for display.
#[derive(Clone, Copy)]
pub struct TypeKey {
	id: TypeId,
	name: &'static str,
}

impl TypeKey {
	/// Key for `T`. Trait objects (`dyn Trait`) are valid keys too.
	pub fn of<T: ?Sized + 'static>() -> Self {
		Self {
			id: TypeId::of::<T>(),
			name: std::any::type_name::<T>(),
		}
	}

	pub fn id(&self) -> TypeId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl PartialEq for TypeKey {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TypeKey({})", self.name)
	}
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name)
	}
}

/// An instance the registry can adapt.
///
/// Implement with [`adaptable!`](crate::adaptable) unless the reported type
/// key must differ from the concrete type.
pub trait Adaptable: Any + Send + Sync {
	/// The source type used for factory lookup.
	fn type_key(&self) -> TypeKey;

	fn as_any(&self) -> &dyn Any;

	fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Implements [`Adaptable`] for concrete types, keyed by the type itself.
#[macro_export]
macro_rules! adaptable {
	($($ty:ty),+ $(,)?) => {
		$(
			impl $crate::Adaptable for $ty {
				fn type_key(&self) -> $crate::TypeKey {
					$crate::TypeKey::of::<$ty>()
				}

				fn as_any(&self) -> &dyn ::std::any::Any {
					self
				}

				fn into_any(
					self: ::std::sync::Arc<Self>,
				) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
					self
				}
			}
		)+
	};
}
