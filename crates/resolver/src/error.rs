//! Error types for resolution, installation and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while resolving a code unit.
#[derive(Debug, Error)]
pub enum ResolveError {
	/// Neither the resolver nor any registered child scope knows the name.
	#[error("unit not found: {0}")]
	NotFound(String),

	/// A scope located the unit but could not read it.
	#[error("failed to read unit {name}: {source}")]
	Io {
		/// Name of the unit being resolved.
		name: String,
		/// The underlying I/O error.
		#[source]
		source: io::Error,
	},
}

impl ResolveError {
	/// Returns true for an ordinary negative lookup.
	pub fn is_not_found(&self) -> bool {
		matches!(self, ResolveError::NotFound(_))
	}
}

/// Errors raised by the install-time hooks.
///
/// Any failure leaves the staging area in whatever state the failing file
/// operation reached; nothing is rolled back.
#[derive(Debug, Error)]
pub enum InstallError {
	/// The resolver has not been attached to a root context yet.
	#[error("no root context attached")]
	NotAttached,

	/// A tree or fragment operation failed.
	#[error("install failed at {path}: {source}")]
	Io {
		/// Path the failing operation was working on.
		path: PathBuf,
		/// The underlying I/O error.
		#[source]
		source: io::Error,
	},
}

/// Errors raised by resolver lifecycle operations.
#[derive(Debug, Error)]
pub enum ResolverError {
	/// `attach` was called on a resolver that already has a root context.
	#[error("root context already attached at {0}")]
	AlreadyAttached(PathBuf),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or shape.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: io::Error,
	},
}
