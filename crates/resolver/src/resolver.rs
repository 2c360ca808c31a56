//! The hierarchical resolver.
//!
//! # Role
//!
//! Answers unit and resource lookups by consulting itself first (defined
//! units or resources, parent, local scope) and then each registered child
//! scope in registration order. Children can be attached and detached while
//! lookups are in flight.
//!
//! # Locking
//!
//! - The define lock is held only to read and to record defined units. It is
//!   never held across a parent, local-scope or child call, so any of them may
//!   call back into this resolver (see `invariants::test_reentrant_self_lookup`
//!   and `invariants::test_reentrant_child_lookup`).
//! - The first recorded definition of a name wins; a racing definition of
//!   the same name is discarded in favour of it.
//! - Children are read from a lock-free snapshot; register, unregister and
//!   clear take the list lock and invalidate the snapshot.
//! - Resource lookups take no lock beyond the cache map read.
//! - No lock is ever shared with a child scope.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, trace};
use url::Url;

use crate::cache::ResourceCache;
use crate::config::ResolverConfig;
use crate::error::{InstallError, ResolveError, ResolverError};
use crate::install::{self, FragmentMerger, FsFragmentMerger, FsTreeInstaller, TreeInstaller};
use crate::scope::{DirScope, MemScope, ScopeRef, UnitSource};
use crate::snapshot::{ChildList, ChildrenSnapshot};
use crate::unit::{Locators, Unit};

/// Bootstrap-supplied root configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootContext {
	home: PathBuf,
}

impl RootContext {
	pub fn new(home: impl Into<PathBuf>) -> Self {
		Self { home: home.into() }
	}

	pub fn home(&self) -> &Path {
		&self.home
	}
}

struct Attachment {
	root: RootContext,
	web_inf: PathBuf,
}

/// Builder for [`Resolver`].
pub struct ResolverBuilder {
	local: ScopeRef,
	parent: Option<Arc<dyn UnitSource>>,
	config: ResolverConfig,
	installer: Arc<dyn TreeInstaller>,
	merger: Arc<dyn FragmentMerger>,
}

impl ResolverBuilder {
	/// Sets the upstream resolver used for unit lookups.
	pub fn parent(mut self, parent: Arc<dyn UnitSource>) -> Self {
		self.parent = Some(parent);
		self
	}

	pub fn config(mut self, config: ResolverConfig) -> Self {
		self.config = config;
		self
	}

	pub fn installer(mut self, installer: Arc<dyn TreeInstaller>) -> Self {
		self.installer = installer;
		self
	}

	pub fn merger(mut self, merger: Arc<dyn FragmentMerger>) -> Self {
		self.merger = merger;
		self
	}

	pub fn build(self) -> Resolver {
		Resolver {
			config: self.config,
			parent: self.parent,
			local: self.local,
			defined: Mutex::new(FxHashMap::default()),
			children: ChildList::new(),
			resources: ResourceCache::new(),
			attachment: OnceLock::new(),
			installer: self.installer,
			merger: self.merger,
		}
	}
}

/// Live-reloadable hierarchical resolver.
pub struct Resolver {
	config: ResolverConfig,
	parent: Option<Arc<dyn UnitSource>>,
	local: ScopeRef,
	/// Units defined through the local scope, guarded by the define lock.
	defined: Mutex<FxHashMap<String, Arc<Unit>>>,
	children: ChildList,
	resources: ResourceCache,
	attachment: OnceLock<Attachment>,
	installer: Arc<dyn TreeInstaller>,
	merger: Arc<dyn FragmentMerger>,
}

impl Resolver {
	/// Starts building a resolver whose own content is `local`.
	pub fn builder(local: ScopeRef) -> ResolverBuilder {
		ResolverBuilder {
			local,
			parent: None,
			config: ResolverConfig::default(),
			installer: Arc::new(FsTreeInstaller),
			merger: Arc::new(FsFragmentMerger),
		}
	}

	/// A resolver with no local content and no parent.
	pub fn empty() -> Self {
		Self::builder(Arc::new(MemScope::new("self"))).build()
	}

	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	/// Stores the bootstrap root context. Only the first call succeeds.
	pub fn attach(&self, root: RootContext) -> Result<(), ResolverError> {
		let web_inf = self.config.web_inf(root.home());
		let mut fresh = false;
		let current = self.attachment.get_or_init(|| {
			fresh = true;
			Attachment { root, web_inf }
		});
		if !fresh {
			return Err(ResolverError::AlreadyAttached(current.root.home.clone()));
		}
		debug!(web_inf = %current.web_inf.display(), "resolver attached");
		Ok(())
	}

	pub fn root(&self) -> Option<&RootContext> {
		self.attachment.get().map(|a| &a.root)
	}

	/// Resolves a unit: self first, then children in registration order.
	pub fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		match self.resolve_self(name) {
			Ok(unit) => return Ok(unit),
			Err(e) => trace!(%name, error = %e, "self lookup missed"),
		}
		for child in self.children().iter() {
			match child.resolve_local(name) {
				Ok(unit) => return Ok(unit),
				Err(e) => trace!(scope = child.label(), %name, error = %e, "child lookup missed"),
			}
		}
		Err(ResolveError::NotFound(name.to_string()))
	}

	/// Self lookup: defined table, parent, local scope.
	fn resolve_self(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		if let Some(unit) = self.defined.lock().get(name) {
			return Ok(Arc::clone(unit));
		}
		if let Some(parent) = &self.parent
			&& let Ok(unit) = parent.resolve(name)
		{
			return Ok(unit);
		}
		let unit = self.local.resolve_local(name)?;
		let mut defined = self.defined.lock();
		Ok(Arc::clone(defined.entry(name.to_string()).or_insert(unit)))
	}

	/// Resolves one resource locator: parent, self, then children in order.
	pub fn resolve_resource(&self, name: &str) -> Option<Url> {
		if let Some(url) = self.resources.get(name) {
			return Some(url);
		}
		let own = self
			.parent
			.as_ref()
			.and_then(|parent| parent.resolve_resource(name))
			.or_else(|| self.local.resolve_local_resource(name));
		if let Some(url) = own {
			return Some(self.resources.insert(name, url));
		}
		self.children()
			.iter()
			.find_map(|child| child.resolve_local_resource(name))
	}

	/// Returns the first non-empty locator set: self, then each child.
	///
	/// The self set is the parent chain's locators followed by the local
	/// scope's. Beyond that this is not a union: once a source yields
	/// anything, later children are not consulted.
	pub fn resolve_all_resources(&self, name: &str) -> Locators {
		let local = self.local.resolve_local_resources(name);
		let mut own = match &self.parent {
			Some(parent) => Locators::new(parent.resolve_resources(name).chain(local)),
			None => local,
		};
		if own.has_next() {
			return own;
		}
		for child in self.children().iter() {
			let mut found = child.resolve_local_resources(name);
			if found.has_next() {
				return found;
			}
		}
		Locators::empty()
	}

	/// Appends a child scope. Registering the same scope twice keeps both.
	pub fn register(&self, scope: ScopeRef) {
		let label = scope.label().to_string();
		let count = self.children.push(scope);
		debug!(scope = %label, children = count, "child scope registered");
	}

	/// Detaches the first registration of `scope`. Returns false if absent.
	pub fn unregister(&self, scope: &ScopeRef) -> bool {
		let removed = self.children.remove(scope);
		debug!(scope = scope.label(), removed, "child scope unregistered");
		removed
	}

	/// Detaches every child scope.
	pub fn clear(&self) {
		let removed = self.children.clear();
		debug!(removed, "child scopes cleared");
	}

	/// Immutable ordered view of the registered children.
	pub fn children(&self) -> Arc<ChildrenSnapshot> {
		self.children.snapshot()
	}

	/// Drops every cached resource locator.
	pub fn flush_resources(&self) {
		let dropped = self.resources.flush();
		debug!(dropped, "resource cache flushed");
	}

	/// Creates a directory scope over `roots`, registers it and returns it.
	pub fn create_local_scope<I, P>(&self, label: impl Into<String>, roots: I) -> Arc<DirScope>
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		let scope = DirScope::new(label, self.config.unit_extension.clone());
		for root in roots {
			scope.add_root(root);
		}
		let scope = Arc::new(scope);
		self.register(Arc::clone(&scope) as ScopeRef);
		scope
	}

	fn web_inf(&self) -> Result<&Path, InstallError> {
		self.attachment
			.get()
			.map(|a| a.web_inf.as_path())
			.ok_or(InstallError::NotAttached)
	}

	/// Replaces `WEB-INF/<staging_dir>` with fresh copies of `dirs`.
	pub fn install_unit_directories<P: AsRef<Path>>(&self, dirs: &[P]) -> Result<(), InstallError> {
		let staging = self.web_inf()?.join(&self.config.staging_dir);
		info!(staging = %staging.display(), dirs = dirs.len(), "installing unit directories");
		install::stage_directories(self.installer.as_ref(), &staging, dirs)?;
		info!(staging = %staging.display(), "unit directories installed");
		Ok(())
	}

	/// Merges resource fragments into `WEB-INF/<classes_dir>`.
	pub fn install_resource_fragments(&self, files: &[PathBuf]) -> Result<(), InstallError> {
		let classes = self.web_inf()?.join(&self.config.classes_dir);
		let grouping = self.config.fragment_grouping;
		info!(target_dir = %classes.display(), files = files.len(), ?grouping, "installing resource fragments");
		let bundles = install::merge_fragments(self.merger.as_ref(), &classes, files, grouping)?;
		info!(bundles, "resource fragments installed");
		Ok(())
	}

	/// Number of times the children snapshot has been rebuilt.
	pub(crate) fn snapshot_rebuilds(&self) -> u64 {
		self.children.rebuilds()
	}
}

impl UnitSource for Resolver {
	fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		Resolver::resolve(self, name)
	}

	fn resolve_resource(&self, name: &str) -> Option<Url> {
		Resolver::resolve_resource(self, name)
	}

	fn resolve_resources(&self, name: &str) -> Locators {
		Resolver::resolve_all_resources(self, name)
	}
}
