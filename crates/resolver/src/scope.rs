//! Child scope contract and the built-in scope implementations.
//!
//! A scope answers lookups from its own content only. Delegation across
//! scopes is exclusively the [`crate::Resolver`]'s job; a scope must never
//! consult its siblings or the resolver's other children.

mod dir;
mod mem;

use std::sync::Arc;

pub use dir::DirScope;
pub use mem::MemScope;
use url::Url;

use crate::error::ResolveError;
use crate::unit::{Locators, Unit};

/// A self-contained resolution unit that can be registered into a resolver.
pub trait Scope: Send + Sync {
	/// Short label used in logs.
	fn label(&self) -> &str;

	/// Resolves a unit from this scope's own content.
	fn resolve_local(&self, name: &str) -> Result<Arc<Unit>, ResolveError>;

	/// Returns the first locator for `name` in this scope, if any.
	fn resolve_local_resource(&self, name: &str) -> Option<Url>;

	/// Returns every locator for `name` in this scope.
	fn resolve_local_resources(&self, name: &str) -> Locators;
}

/// Shared handle to a registered scope.
pub type ScopeRef = Arc<dyn Scope>;

/// Scope identity is the allocation, not the content.
pub(crate) fn same_scope(a: &ScopeRef, b: &ScopeRef) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Upstream resolution, used for a resolver's parent.
///
/// A parent answers for its whole upstream chain. Sources without resources
/// keep the default resource methods.
pub trait UnitSource: Send + Sync {
	fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError>;

	/// First locator for `name` anywhere in this source's chain.
	fn resolve_resource(&self, _name: &str) -> Option<Url> {
		None
	}

	/// Every locator this source's chain reports for `name`.
	fn resolve_resources(&self, _name: &str) -> Locators {
		Locators::empty()
	}
}
