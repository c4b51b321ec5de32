use std::collections::BTreeMap;

use keel_worker::ExecutorConfig;
use serde::Deserialize;

use crate::ConfigLoadError;

const DEFAULT_SECURE_PLACEHOLDER: &str = "********";

/// Model-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
	/// Writer thread settings.
	pub executor: ExecutorConfig,
	/// Shown instead of secure string values to unprivileged callers.
	pub secure_placeholder: String,
	/// Variables consulted after the inherited context and before the environment.
	pub properties: BTreeMap<String, String>,
	/// Fail resolution on undefined `${...}` variables instead of passing them through.
	pub strict_defaults: bool,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			executor: ExecutorConfig::default(),
			secure_placeholder: DEFAULT_SECURE_PLACEHOLDER.to_string(),
			properties: BTreeMap::new(),
			strict_defaults: false,
		}
	}
}

impl ModelConfig {
	/// Parses a TOML document.
	pub fn from_toml_str(s: &str) -> Result<Self, ConfigLoadError> {
		Ok(toml::from_str(s)?)
	}
}
