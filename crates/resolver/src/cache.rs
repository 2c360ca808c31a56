//! Memo of the resolver's own resource hits.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use url::Url;

/// Positive cache of resources found in a resolver's local scope.
///
/// Entries are never invalidated one by one; [`ResourceCache::flush`] drops
/// everything. A lookup racing a flush may observe either state.
#[derive(Debug, Default)]
pub(crate) struct ResourceCache {
	entries: RwLock<FxHashMap<String, Url>>,
}

impl ResourceCache {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn get(&self, name: &str) -> Option<Url> {
		self.entries.read().get(name).cloned()
	}

	/// Records a hit. The first recorded locator for a name is kept.
	pub(crate) fn insert(&self, name: &str, url: Url) -> Url {
		self.entries
			.write()
			.entry(name.to_string())
			.or_insert(url)
			.clone()
	}

	/// Clears the cache and returns the number of dropped entries.
	pub(crate) fn flush(&self) -> usize {
		let mut entries = self.entries.write();
		let dropped = entries.len();
		entries.clear();
		dropped
	}

	#[cfg(test)]
	fn len(&self) -> usize {
		self.entries.read().len()
	}

	#[cfg(test)]
	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_insert_wins_until_flush() {
		let cache = ResourceCache::new();
		let a = Url::parse("mem:/a/r").unwrap();
		let b = Url::parse("mem:/b/r").unwrap();

		assert_eq!(cache.insert("r", a.clone()), a);
		assert_eq!(cache.insert("r", b.clone()), a);
		assert_eq!(cache.get("r"), Some(a));

		assert_eq!(cache.flush(), 1);
		assert!(cache.is_empty());
		assert_eq!(cache.insert("r", b.clone()), b);
	}
}
