//! Storage backend used to validate checksum index candidates

use std::convert::TryFrom;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::StorageError;

/// Current state of a stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
	pub folder_id: String,
	pub file_id: String,
	pub name: String,
	/// Changes whenever the file content or metadata changes
	pub sequence: u64,
}

/// Read access to stored files
pub trait StorageBackend {
	/// Fetch a file; `revision` selects a specific revision, `None` the
	/// current one.
	fn get_file(
		&self,
		folder_id: &str,
		file_id: &str,
		revision: Option<&str>,
	) -> Result<StoredFile, StorageError>;
}

/// Storage backend over a local directory tree
///
/// Folder ids are directories relative to the root, file ids are file
/// names. The sequence number is the modification time in milliseconds.
pub struct LocalStorage {
	root: PathBuf,
}

impl LocalStorage {
	pub fn new(root: &Path) -> Self {
		LocalStorage { root: root.to_path_buf() }
	}

	fn resolve(&self, folder_id: &str, file_id: &str) -> PathBuf {
		self.root.join(folder_id.trim_start_matches('/')).join(file_id)
	}
}

impl StorageBackend for LocalStorage {
	fn get_file(
		&self,
		folder_id: &str,
		file_id: &str,
		revision: Option<&str>,
	) -> Result<StoredFile, StorageError> {
		if let Some(revision) = revision {
			return Err(StorageError::Unavailable {
				message: format!("revision {} requested, local storage keeps no history", revision),
			});
		}

		let path = self.resolve(folder_id, file_id);
		let meta = match std::fs::metadata(&path) {
			Ok(meta) if meta.is_file() => meta,
			Ok(_) => {
				return Err(StorageError::NotFound {
					folder_id: folder_id.to_string(),
					file_id: file_id.to_string(),
				})
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound {
					folder_id: folder_id.to_string(),
					file_id: file_id.to_string(),
				})
			}
			Err(e) => {
				return Err(StorageError::Unavailable {
					message: format!("{}: {}", path.display(), e),
				})
			}
		};

		let sequence = meta
			.modified()
			.ok()
			.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
			.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
			.unwrap_or(0);

		Ok(StoredFile {
			folder_id: folder_id.to_string(),
			file_id: file_id.to_string(),
			name: file_id.to_string(),
			sequence,
		})
	}
}


// vim: ts=4
