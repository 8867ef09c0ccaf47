//! JSON documents describing one sync round
//!
//! A `SyncRound` carries the raw actions produced by the diff for files and
//! directories, plus the server file versions already known in this round.
//! `OptimizedRound` carries the pipeline output handed to the executor.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SyncOptError;
use crate::optimizer::Pipeline;
use crate::types::{DirectoryVersion, FileVersion, SyncResult};

/// Raw input of one sync round
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncRound {
	/// Storage folder id of the synchronized folder
	pub folder_id: Option<String>,

	/// Server files already present in the synchronized folder
	pub server_files: Vec<FileVersion>,

	pub files: SyncResult<FileVersion>,

	pub directories: SyncResult<DirectoryVersion>,
}

/// Optimized output of one sync round
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizedRound {
	pub files: SyncResult<FileVersion>,
	pub directories: SyncResult<DirectoryVersion>,
}

impl SyncRound {
	/// Read a round document
	pub async fn load(path: &Path) -> Result<Self, SyncOptError> {
		let contents = tokio::fs::read_to_string(path).await?;
		Self::parse(&contents)
	}

	pub fn parse(contents: &str) -> Result<Self, SyncOptError> {
		serde_json::from_str(contents).map_err(|e| SyncOptError::InvalidRound {
			message: format!("Failed to parse sync round: {}", e),
		})
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty() && self.directories.is_empty()
	}

	/// Run the pipeline over both action sets
	pub fn optimize(&self, pipeline: &Pipeline<'_>) -> OptimizedRound {
		OptimizedRound {
			files: pipeline.optimize_files(
				&self.files,
				&self.server_files,
				self.folder_id.as_deref(),
			),
			directories: pipeline.optimize_directories(&self.directories),
		}
	}
}

impl OptimizedRound {
	pub fn to_json(&self, pretty: bool) -> Result<String, SyncOptError> {
		let json = if pretty { serde_json::to_string_pretty(self)? } else { serde_json::to_string(self)? };
		Ok(json)
	}

	/// Write the round document, creating parent directories as needed
	pub async fn save(&self, path: &Path, pretty: bool) -> Result<(), SyncOptError> {
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() && !parent.exists() {
				tokio::fs::create_dir_all(parent).await?;
			}
		}
		tokio::fs::write(path, self.to_json(pretty)?).await?;
		Ok(())
	}
}


// vim: ts=4
