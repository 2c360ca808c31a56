//! Resolved values: code units and resource locators.

use std::fmt;
use std::iter::Peekable;

use url::Url;

/// A resolved code unit.
///
/// Units are immutable once defined and shared as `Arc<Unit>`.
pub struct Unit {
	name: String,
	origin: Url,
	bytes: Box<[u8]>,
}

impl Unit {
	/// Creates a unit named `name` loaded from `origin`.
	pub fn new(name: impl Into<String>, origin: Url, bytes: impl Into<Box<[u8]>>) -> Self {
		Self {
			name: name.into(),
			origin,
			bytes: bytes.into(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Locator the unit was read from.
	pub fn origin(&self) -> &Url {
		&self.origin
	}

	pub fn bytes(&self) -> &[u8] {
		&self.bytes
	}
}

impl fmt::Debug for Unit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Unit")
			.field("name", &self.name)
			.field("origin", &self.origin.as_str())
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Lazy, finite sequence of resource locators.
///
/// Consumed once; there is no way to restart it. [`Locators::has_next`]
/// peeks without consuming, which is how the resolver picks the first
/// non-empty source.
pub struct Locators {
	inner: Peekable<Box<dyn Iterator<Item = Url> + Send>>,
}

impl Locators {
	/// Wraps any sendable iterator of locators.
	pub fn new<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = Url>,
		I::IntoIter: Send + 'static,
	{
		let boxed: Box<dyn Iterator<Item = Url> + Send> = Box::new(iter.into_iter());
		Self {
			inner: boxed.peekable(),
		}
	}

	/// An exhausted sequence.
	pub fn empty() -> Self {
		Self::new(std::iter::empty())
	}

	/// Returns true if at least one more locator is available.
	pub fn has_next(&mut self) -> bool {
		self.inner.peek().is_some()
	}
}

impl Iterator for Locators {
	type Item = Url;

	fn next(&mut self) -> Option<Url> {
		self.inner.next()
	}
}

impl fmt::Debug for Locators {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Locators").finish_non_exhaustive()
	}
}
