//! Capability adapter registry.
//!
//! Maps a source type and a requested capability type to an adapter factory.
//! Lookups walk the source type's declared supertypes depth-first and memoize
//! the winning factory on every descriptor along the way, so repeated
//! adaptation of the same type is a single map read.
//!
//! # Concurrency
//!
//! - **Reads:** lock-free on a memo hit (atomic load of a copy-on-write map).
//! - **Misses and writes:** serialized by one registry-wide mutex; a miss
//!   re-checks the memo after taking it.
//!
//! There is no process-wide instance. Construct an [`AdapterRegistry`] and
//! share it (usually as `Arc<AdapterRegistry>`) with every consumer.

mod descriptor;
mod factory;
mod key;
mod registry;

pub use descriptor::TypeDescriptor;
pub use factory::{AdapterFactory, FactoryRef, FnFactory};
pub use key::{Adaptable, TypeKey};
pub use registry::{AdapterRegistry, AdapterStats, MemoPolicy};

#[cfg(any(test, doc))]
pub(crate) mod invariants;
