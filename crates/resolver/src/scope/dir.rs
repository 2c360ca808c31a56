use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use url::Url;

use super::Scope;
use crate::error::ResolveError;
use crate::unit::{Locators, Unit};

/// Scope backed by an ordered list of filesystem roots.
///
/// Unit `a.b.C` is read from `<root>/a/b/C.<ext>`; resource names are joined
/// verbatim under each root. Roots are searched in the order they were added.
pub struct DirScope {
	label: String,
	roots: RwLock<Vec<PathBuf>>,
	unit_extension: String,
}

impl DirScope {
	pub fn new(label: impl Into<String>, unit_extension: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			roots: RwLock::new(Vec::new()),
			unit_extension: unit_extension.into(),
		}
	}

	/// Builder-style variant of [`DirScope::add_root`].
	pub fn with_root(self, root: impl Into<PathBuf>) -> Self {
		self.add_root(root);
		self
	}

	/// Appends a root; later lookups see it after all existing roots.
	pub fn add_root(&self, root: impl Into<PathBuf>) {
		self.roots.write().push(root.into());
	}

	pub fn roots(&self) -> Vec<PathBuf> {
		self.roots.read().clone()
	}

	fn unit_path(&self, name: &str) -> PathBuf {
		let mut rel: PathBuf = name.split('.').collect();
		rel.set_extension(&self.unit_extension);
		rel
	}
}

/// Converts a filesystem path into a `file://` locator.
pub(crate) fn file_locator(path: &Path) -> Option<Url> {
	let absolute = std::path::absolute(path).ok()?;
	Url::from_file_path(absolute).ok()
}

fn resource_rel(name: &str) -> &Path {
	Path::new(name.trim_start_matches('/'))
}

impl Scope for DirScope {
	fn label(&self) -> &str {
		&self.label
	}

	fn resolve_local(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		let rel = self.unit_path(name);
		for root in self.roots.read().iter() {
			let path = root.join(&rel);
			let bytes = match std::fs::read(&path) {
				Ok(bytes) => bytes,
				Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
				Err(source) => {
					return Err(ResolveError::Io {
						name: name.to_string(),
						source,
					});
				}
			};
			let Some(origin) = file_locator(&path) else {
				continue;
			};
			return Ok(Arc::new(Unit::new(name, origin, bytes)));
		}
		Err(ResolveError::NotFound(name.to_string()))
	}

	fn resolve_local_resource(&self, name: &str) -> Option<Url> {
		let rel = resource_rel(name);
		self.roots
			.read()
			.iter()
			.map(|root| root.join(rel))
			.find(|path| path.is_file())
			.and_then(|path| file_locator(&path))
	}

	fn resolve_local_resources(&self, name: &str) -> Locators {
		let rel = resource_rel(name).to_path_buf();
		let roots = self.roots();
		Locators::new(roots.into_iter().filter_map(move |root| {
			let path = root.join(&rel);
			if path.is_file() {
				file_locator(&path)
			} else {
				None
			}
		}))
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	fn write(root: &Path, rel: &str, content: &str) {
		let path = root.join(rel);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(path, content).unwrap();
	}

	#[test]
	fn unit_name_maps_to_nested_file() {
		let root = tempfile::tempdir().expect("must create tempdir");
		write(root.path(), "com/acme/Widget.class", "widget");

		let scope = DirScope::new("mod", "class").with_root(root.path());
		let unit = scope.resolve_local("com.acme.Widget").expect("unit resolves");
		assert_eq!(unit.name(), "com.acme.Widget");
		assert_eq!(unit.bytes(), b"widget");
		assert_eq!(unit.origin().scheme(), "file");
		assert!(unit.origin().path().ends_with("com/acme/Widget.class"));
	}

	#[test]
	fn missing_unit_is_not_found() {
		let root = tempfile::tempdir().expect("must create tempdir");
		let scope = DirScope::new("mod", "class").with_root(root.path());
		let err = scope.resolve_local("com.acme.Missing").unwrap_err();
		assert!(err.is_not_found());
	}

	#[test]
	fn roots_are_searched_in_insertion_order() {
		let first = tempfile::tempdir().expect("must create tempdir");
		let second = tempfile::tempdir().expect("must create tempdir");
		write(first.path(), "r.properties", "first");
		write(second.path(), "r.properties", "second");

		let scope = DirScope::new("mod", "class").with_root(first.path());
		scope.add_root(second.path());

		let url = scope.resolve_local_resource("/r.properties").expect("resource resolves");
		assert_eq!(url, file_locator(&first.path().join("r.properties")).unwrap());

		let all: Vec<Url> = scope.resolve_local_resources("r.properties").collect();
		assert_eq!(all.len(), 2);
		assert_eq!(all[1], file_locator(&second.path().join("r.properties")).unwrap());
	}

	#[test]
	fn directories_are_not_resources() {
		let root = tempfile::tempdir().expect("must create tempdir");
		fs::create_dir_all(root.path().join("assets")).unwrap();
		let scope = DirScope::new("mod", "class").with_root(root.path());
		assert!(scope.resolve_local_resource("assets").is_none());
		assert!(!scope.resolve_local_resources("assets").has_next());
	}
}
