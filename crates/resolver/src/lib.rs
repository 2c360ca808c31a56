//! Hot-reloadable hierarchical resolver for code units and resources.
//!
//! # Mental Model
//!
//! 1. **Self:** a [`Resolver`] owns a local [`Scope`] and optionally a parent
//!    [`UnitSource`]. Units are looked up in the parent and then the local
//!    scope; resources only in the local scope.
//! 2. **Children:** scopes registered at runtime are consulted after self, in
//!    registration order. The first hit wins and per-child failures are
//!    skipped.
//! 3. **Snapshots:** lookups read an immutable [`ChildrenSnapshot`] without
//!    locking. Mutations invalidate it and the next reader rebuilds it.
//! 4. **Install:** [`Resolver::install_unit_directories`] and
//!    [`Resolver::install_resource_fragments`] stage files under the attached
//!    root through the [`TreeInstaller`] and [`FragmentMerger`] collaborators.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`Resolver`] | Self-then-children lookup, child registration, install hooks. |
//! | [`Scope`] | Local-only lookup contract for child scopes. |
//! | [`DirScope`] / [`MemScope`] | Filesystem and in-memory scopes. |
//! | [`ChildrenSnapshot`] | Immutable ordered view of the children. |
//! | [`ResolverConfig`] | Layout and fragment-grouping settings. |

mod cache;
mod config;
mod error;
pub mod install;
mod resolver;
mod scope;
mod snapshot;
mod unit;

pub use config::{FragmentGrouping, ResolverConfig, WEB_INF};
pub use error::{ConfigError, InstallError, ResolveError, ResolverError};
pub use install::{FragmentMerger, FsFragmentMerger, FsTreeInstaller, TreeInstaller};
pub use resolver::{Resolver, ResolverBuilder, RootContext};
pub use scope::{DirScope, MemScope, Scope, ScopeRef, UnitSource};
pub use snapshot::ChildrenSnapshot;
pub use unit::{Locators, Unit};
pub use url::Url;

#[cfg(any(test, doc))]
pub(crate) mod invariants;
