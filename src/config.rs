//! Optimizer configuration
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (OptimizerConfig::default())
//! 2. Config file (`.json`/`.json5` or `.toml`)
//! 3. Environment variables (SYNCOPT_* prefix)
//! 4. CLI flags (highest priority, applied by the binary)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one optimizer pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizerConfig {
	// ========================================================================
	// SCOPE
	// ========================================================================
	/// User the checksum index is scoped to
	pub user: String,

	// ========================================================================
	// PASSES
	// ========================================================================
	/// Collapse disguised file renames
	pub file_renames: bool,

	/// Collapse directory moves and drop redundant nested renames
	pub directory_renames: bool,

	/// Replace uploads of known content with server-side copies
	pub copies: bool,

	/// Sort actions into execution order
	pub ordering: bool,

	// ========================================================================
	// COLLABORATORS
	// ========================================================================
	/// Checksum index database (copy detection is limited to in-memory
	/// server versions when unset)
	pub checksum_index: Option<PathBuf>,

	/// Root directory of the local storage backend
	pub storage_root: Option<PathBuf>,

	// ========================================================================
	// OUTPUT & LOGGING
	// ========================================================================
	/// Log level (trace, debug, info, warn, error)
	pub log_level: String,

	/// Pretty-print JSON output
	pub pretty: bool,
}

impl Default for OptimizerConfig {
	fn default() -> Self {
		OptimizerConfig {
			user: "default".to_string(),
			file_renames: true,
			directory_renames: true,
			copies: true,
			ordering: true,
			checksum_index: None,
			storage_root: None,
			log_level: "info".to_string(),
			pretty: true,
		}
	}
}

impl OptimizerConfig {
	/// Load configuration from a file, choosing the format by extension
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let display = path.display().to_string();
		let contents = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::ReadFailed { path: display.clone(), source })?;

		match path.extension().and_then(|e| e.to_str()) {
			Some("toml") => toml::from_str(&contents)
				.map_err(|e| ConfigError::ParseFailed { path: display, message: e.to_string() }),
			_ => json5::from_str(&contents)
				.map_err(|e| ConfigError::ParseFailed { path: display, message: e.to_string() }),
		}
	}

	/// Apply SYNCOPT_* variables from the process environment
	pub fn apply_env(&mut self) -> Result<(), ConfigError> {
		self.apply_overrides(std::env::vars())
	}

	/// Apply SYNCOPT_* key/value overrides
	pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			match key.as_str() {
				"SYNCOPT_USER" => self.user = value,
				"SYNCOPT_INDEX" => self.checksum_index = Some(PathBuf::from(value)),
				"SYNCOPT_STORAGE_ROOT" => self.storage_root = Some(PathBuf::from(value)),
				"SYNCOPT_LOG" => self.log_level = value,
				"SYNCOPT_FILE_RENAMES" => self.file_renames = parse_bool(&key, &value)?,
				"SYNCOPT_DIRECTORY_RENAMES" => self.directory_renames = parse_bool(&key, &value)?,
				"SYNCOPT_COPIES" => self.copies = parse_bool(&key, &value)?,
				"SYNCOPT_ORDERING" => self.ordering = parse_bool(&key, &value)?,
				_ => {}
			}
		}
		Ok(())
	}
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }),
	}
}


// vim: ts=4
