//! Resolver configuration.
//!
//! All fields are optional in the TOML form; missing keys take the defaults
//! below.
//!
//! ```toml
//! app-unit = "app.war"
//! staging-dir = "dev"
//! classes-dir = "classes"
//! unit-extension = "class"
//! fragment-grouping = "bundle-name"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Directory below the application unit that holds staged content.
pub const WEB_INF: &str = "WEB-INF";

/// How `install_resource_fragments` groups fragment files into bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentGrouping {
	/// Every fragment is its own group, keyed by its full file name.
	///
	/// This is the historical behaviour: the logical bundle name was computed
	/// and then discarded, so nothing was ever merged.
	#[default]
	FileName,
	/// Fragments are grouped by their file name minus the final extension.
	BundleName,
}

impl FragmentGrouping {
	/// Derives the bundle key for a fragment file name.
	pub fn bundle_key<'a>(&self, file_name: &'a str) -> &'a str {
		match self {
			FragmentGrouping::FileName => file_name,
			FragmentGrouping::BundleName => match file_name.rfind('.') {
				Some(idx) if idx > 0 => &file_name[..idx],
				_ => file_name,
			},
		}
	}
}

/// Configuration for a [`crate::Resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolverConfig {
	/// Name of the application unit directory below the home directory.
	pub app_unit: String,
	/// Staging subdirectory of `WEB-INF` replaced by unit directory installs.
	pub staging_dir: String,
	/// Subdirectory of `WEB-INF` receiving merged resource fragments.
	pub classes_dir: String,
	/// File extension of unit files inside directory scopes.
	pub unit_extension: String,
	/// Fragment grouping policy.
	pub fragment_grouping: FragmentGrouping,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			app_unit: "app.war".to_string(),
			staging_dir: "dev".to_string(),
			classes_dir: "classes".to_string(),
			unit_extension: "class".to_string(),
			fragment_grouping: FragmentGrouping::default(),
		}
	}
}

impl ResolverConfig {
	/// Parses a configuration from TOML text.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(input)?)
	}

	/// Reads and parses a configuration file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&content)
	}

	/// Returns `<home>/<app_unit>/WEB-INF`.
	pub fn web_inf(&self, home: &Path) -> PathBuf {
		home.join(&self.app_unit).join(WEB_INF)
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[test]
	fn empty_toml_yields_defaults() {
		let config = ResolverConfig::from_toml_str("").unwrap();
		assert_eq!(config, ResolverConfig::default());
	}

	#[test]
	fn toml_overrides_selected_fields() {
		let config = ResolverConfig::from_toml_str(
			"app-unit = \"shop.war\"\nfragment-grouping = \"bundle-name\"\n",
		)
		.unwrap();
		assert_eq!(config.app_unit, "shop.war");
		assert_eq!(config.fragment_grouping, FragmentGrouping::BundleName);
		assert_eq!(config.staging_dir, "dev");
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = ResolverConfig::from_toml_str("stagin-dir = \"x\"").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn load_reports_missing_file_path() {
		let dir = tempfile::tempdir().expect("must create tempdir");
		let path = dir.path().join("missing.toml");
		match ResolverConfig::load(&path) {
			Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
			other => panic!("expected Io error, got {other:?}"),
		}
	}

	#[test]
	fn web_inf_is_below_app_unit() {
		let config = ResolverConfig::default();
		assert_eq!(
			config.web_inf(Path::new("/srv/home")),
			PathBuf::from("/srv/home/app.war/WEB-INF")
		);
	}

	#[rstest]
	#[case(FragmentGrouping::FileName, "messages.properties.fr", "messages.properties.fr")]
	#[case(FragmentGrouping::FileName, "README", "README")]
	#[case(FragmentGrouping::BundleName, "messages.properties.fr", "messages.properties")]
	#[case(FragmentGrouping::BundleName, "labels.txt", "labels")]
	#[case(FragmentGrouping::BundleName, "README", "README")]
	#[case(FragmentGrouping::BundleName, ".hidden", ".hidden")]
	fn bundle_key_derivation(
		#[case] grouping: FragmentGrouping,
		#[case] file_name: &str,
		#[case] expected: &str,
	) {
		assert_eq!(grouping.bundle_key(file_name), expected);
	}
}
