#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use url::Url;

use crate::error::ResolveError;
use crate::resolver::Resolver;
use crate::scope::{MemScope, Scope, ScopeRef};
use crate::unit::{Locators, Unit};

/// Invariant: a snapshot is always an exact copy of the child list at some instant.
///
/// The writer keeps a sliding window of at most five consecutively numbered
/// scopes; every snapshot a reader sees must be such a window.
pub(crate) fn inv_snapshot_never_torn() {
	const ROUNDS: usize = 400;
	const WINDOW: usize = 4;

	let resolver = Resolver::empty();
	let done = AtomicBool::new(false);

	thread::scope(|s| {
		for _ in 0..4 {
			s.spawn(|| {
				while !done.load(Ordering::Acquire) {
					let snap = resolver.children();
					let ids: Vec<usize> = snap
						.labels()
						.iter()
						.map(|l| l.parse().expect("numeric label"))
						.collect();
					assert!(ids.len() <= WINDOW + 1, "snapshot too long: {ids:?}");
					for pair in ids.windows(2) {
						assert_eq!(pair[0] + 1, pair[1], "torn snapshot: {ids:?}");
					}
				}
			});
		}

		let mut live: Vec<ScopeRef> = Vec::new();
		for i in 0..ROUNDS {
			let scope: ScopeRef = Arc::new(MemScope::new(i.to_string()));
			resolver.register(Arc::clone(&scope));
			live.push(scope);
			if live.len() > WINDOW {
				let oldest = live.remove(0);
				assert!(resolver.unregister(&oldest));
			}
		}
		done.store(true, Ordering::Release);
	});

	assert_eq!(resolver.children().len(), WINDOW);
}

#[cfg_attr(test, test)]
pub(crate) fn test_snapshot_never_torn() {
	inv_snapshot_never_torn()
}

/// Invariant: a snapshot taken before a mutation stays valid and unchanged.
pub(crate) fn inv_held_snapshot_survives_unregister() {
	let resolver = Resolver::empty();
	let scope: ScopeRef = Arc::new(MemScope::new("mod").with_unit("x.A", b"a".to_vec()));
	resolver.register(Arc::clone(&scope));

	let before = resolver.children();
	assert!(resolver.unregister(&scope));
	let after = resolver.children();

	assert_eq!(before.labels(), vec!["mod"]);
	assert!(before[0].resolve_local("x.A").is_ok());
	assert!(after.is_empty());
	assert!(resolver.resolve("x.A").unwrap_err().is_not_found());
}

#[cfg_attr(test, test)]
pub(crate) fn test_held_snapshot_survives_unregister() {
	inv_held_snapshot_survives_unregister()
}

/// A child scope that resolves its dependencies through its owning resolver.
struct CallbackScope {
	owner: Weak<Resolver>,
}

impl Scope for CallbackScope {
	fn label(&self) -> &str {
		"callback"
	}

	fn resolve_local(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		if name != "plugin.Main" {
			return Err(ResolveError::NotFound(name.to_string()));
		}
		let owner = self
			.owner
			.upgrade()
			.ok_or_else(|| ResolveError::NotFound(name.to_string()))?;
		let dep = owner.resolve("shared.Dep")?;
		let origin = Url::parse("mem:/callback/plugin.Main").expect("valid locator");
		Ok(Arc::new(Unit::new(name, origin, dep.bytes().to_vec())))
	}

	fn resolve_local_resource(&self, _name: &str) -> Option<Url> {
		None
	}

	fn resolve_local_resources(&self, _name: &str) -> Locators {
		Locators::empty()
	}
}

/// Invariant: a child may call back into its resolver while being queried.
///
/// The define lock is released before children are consulted; holding it
/// across delegation would hang here.
pub(crate) fn inv_reentrant_child_lookup() {
	let local = MemScope::new("self").with_unit("shared.Dep", b"dep".to_vec());
	let resolver = Arc::new(Resolver::builder(Arc::new(local)).build());
	resolver.register(Arc::new(CallbackScope {
		owner: Arc::downgrade(&resolver),
	}));

	let (tx, rx) = mpsc::channel();
	let worker = Arc::clone(&resolver);
	thread::spawn(move || {
		let _ = tx.send(worker.resolve("plugin.Main").map(|u| u.bytes().to_vec()));
	});

	let bytes = rx
		.recv_timeout(Duration::from_secs(5))
		.expect("reentrant lookup deadlocked")
		.expect("plugin.Main resolves");
	assert_eq!(bytes, b"dep");
}

#[cfg_attr(test, test)]
pub(crate) fn test_reentrant_child_lookup() {
	inv_reentrant_child_lookup()
}

/// A self scope whose units depend on units supplied by the resolver's children.
struct SelfCallbackScope {
	owner: OnceLock<Weak<Resolver>>,
}

impl Scope for SelfCallbackScope {
	fn label(&self) -> &str {
		"self"
	}

	fn resolve_local(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
		if name != "app.Main" {
			return Err(ResolveError::NotFound(name.to_string()));
		}
		let owner = self
			.owner
			.get()
			.and_then(Weak::upgrade)
			.ok_or_else(|| ResolveError::NotFound(name.to_string()))?;
		let dep = owner.resolve("lib.Dep")?;
		let origin = Url::parse("mem:/self/app.Main").expect("valid locator");
		Ok(Arc::new(Unit::new(name, origin, dep.bytes().to_vec())))
	}

	fn resolve_local_resource(&self, _name: &str) -> Option<Url> {
		None
	}

	fn resolve_local_resources(&self, _name: &str) -> Locators {
		Locators::empty()
	}
}

/// Invariant: the local scope may call back into its resolver while defining a unit.
///
/// The define lock is not held across the local lookup; holding it would
/// hang here, since the lock is not reentrant.
pub(crate) fn inv_reentrant_self_lookup() {
	let local = Arc::new(SelfCallbackScope { owner: OnceLock::new() });
	let resolver = Arc::new(Resolver::builder(local.clone()).build());
	let _ = local.owner.set(Arc::downgrade(&resolver));
	resolver.register(Arc::new(MemScope::new("lib").with_unit("lib.Dep", b"dep".to_vec())));

	let (tx, rx) = mpsc::channel();
	let worker = Arc::clone(&resolver);
	thread::spawn(move || {
		let _ = tx.send(worker.resolve("app.Main").map(|u| u.bytes().to_vec()));
	});

	let bytes = rx
		.recv_timeout(Duration::from_secs(5))
		.expect("self lookup re-entered the define lock")
		.expect("app.Main resolves");
	assert_eq!(bytes, b"dep");

	let first = resolver.resolve("app.Main").expect("defined unit resolves");
	let second = resolver.resolve("app.Main").expect("defined unit resolves");
	assert!(Arc::ptr_eq(&first, &second));
}

#[cfg_attr(test, test)]
pub(crate) fn test_reentrant_self_lookup() {
	inv_reentrant_self_lookup()
}

/// Invariant: concurrent first-time readers publish one snapshot per mutation.
pub(crate) fn inv_single_rebuild_per_mutation() {
	let resolver = Resolver::empty();
	resolver.register(Arc::new(MemScope::new("a")));

	thread::scope(|s| {
		for _ in 0..8 {
			s.spawn(|| {
				for _ in 0..100 {
					assert_eq!(resolver.children().labels(), vec!["a"]);
				}
			});
		}
	});

	assert_eq!(resolver.snapshot_rebuilds(), 1);
}

#[cfg_attr(test, test)]
pub(crate) fn test_single_rebuild_per_mutation() {
	inv_single_rebuild_per_mutation()
}
