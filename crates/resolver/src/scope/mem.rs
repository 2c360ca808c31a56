use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use url::Url;

use super::Scope;
use crate::error::ResolveError;
use crate::unit::{Locators, Unit};

/// In-memory scope for synthesized content.
///
/// Resources are addressed as `mem:/<label>/<name>`.
pub struct MemScope {
	label: String,
	units: RwLock<FxHashMap<String, Arc<Unit>>>,
	resources: RwLock<FxHashMap<String, Vec<Url>>>,
}

impl MemScope {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			units: RwLock::new(FxHashMap::default()),
			resources: RwLock::new(FxHashMap::default()),
		}
	}

	/// Builder-style variant of [`MemScope::insert_unit`].
	pub fn with_unit(self, name: &str, bytes: impl Into<Box<[u8]>>) -> Self {
		self.insert_unit(name, bytes);
		self
	}

	/// Builder-style variant of [`MemScope::insert_resource`].
	pub fn with_resource(self, name: &str) -> Self {
		self.insert_resource(name);
		self
	}

	/// Defines (or replaces) a unit.
	pub fn insert_unit(&self, name: &str, bytes: impl Into<Box<[u8]>>) -> Arc<Unit> {
		let unit = Arc::new(Unit::new(name, self.locator(name), bytes));
		self.units.write().insert(name.to_string(), Arc::clone(&unit));
		unit
	}

	/// Adds a resource under this scope's own locator and returns it.
	pub fn insert_resource(&self, name: &str) -> Url {
		let url = self.locator(name);
		self.insert_resource_at(name, url.clone());
		url
	}

	/// Adds an extra locator for `name`; a scope may hold several.
	pub fn insert_resource_at(&self, name: &str, url: Url) {
		self.resources
			.write()
			.entry(name.to_string())
			.or_default()
			.push(url);
	}

	pub fn remove_unit(&self, name: &str) -> bool {
		self.units.write().remove(name).is_some()
	}

	pub fn remove_resource(&self, name: &str) -> bool {
		self.resources.write().remove(name).is_some()
	}

	/// Locator this scope assigns to `name`.
	pub fn locator(&self, name: &str) -> Url {
		let mut url = Url::parse("mem:/").expect("static locator base parses");
		if let Ok(mut segments) = url.path_segments_mut() {
			segments
				.pop_if_empty()
				.push(&self.label)
				.extend(name.trim_start_matches('/').split('/'));
		}
		url
	}
}

impl Scope for MemScope {
	fn label(&self) -> &str {
		&self.label
	}

	fn resolve_local(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		self.units
			.read()
			.get(name)
			.cloned()
			.ok_or_else(|| ResolveError::NotFound(name.to_string()))
	}

	fn resolve_local_resource(&self, name: &str) -> Option<Url> {
		self.resources.read().get(name)?.first().cloned()
	}

	fn resolve_local_resources(&self, name: &str) -> Locators {
		let found = self.resources.read().get(name).cloned().unwrap_or_default();
		Locators::new(found)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn locator_embeds_label_and_name() {
		let scope = MemScope::new("plugin-a");
		assert_eq!(scope.locator("conf/r.properties").as_str(), "mem:/plugin-a/conf/r.properties");
	}

	#[test]
	fn units_and_resources_round_trip() {
		let scope = MemScope::new("a").with_unit("x.Y", b"y".to_vec()).with_resource("r.txt");
		assert_eq!(scope.resolve_local("x.Y").unwrap().bytes(), b"y");
		assert!(scope.resolve_local("x.Z").unwrap_err().is_not_found());
		assert_eq!(scope.resolve_local_resource("r.txt"), Some(scope.locator("r.txt")));

		assert!(scope.remove_unit("x.Y"));
		assert!(scope.resolve_local("x.Y").is_err());
	}

	#[test]
	fn extra_locators_follow_the_first() {
		let scope = MemScope::new("a").with_resource("r.txt");
		let extra = Url::parse("mem:/mirror/r.txt").unwrap();
		scope.insert_resource_at("r.txt", extra.clone());

		let all: Vec<Url> = scope.resolve_local_resources("r.txt").collect();
		assert_eq!(all, vec![scope.locator("r.txt"), extra]);
	}
}
