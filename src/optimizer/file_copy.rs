//! Server-side copies for uploads of already known content
//!
//! An upload whose content already exists on the server does not need to be
//! transferred. The content is looked up first among the server versions of
//! the current round, then in the checksum index. Index entries are only
//! hints and are re-validated against the storage backend before use.
//!
//! Lookups are best effort: index or storage failures are logged and the
//! upload is left as it is.

use super::Optimizer;
use crate::error::{OptimizationError, StorageError};
use crate::index::{ChecksumIndex, FileDescriptor};
use crate::logging::*;
use crate::storage::StorageBackend;
use crate::types::{Cause, DriveAction, FileVersion, SyncResult};

pub struct FileCopyOptimizer<'a> {
	server_versions: &'a [FileVersion],
	target_folder: Option<String>,
	index: Option<&'a dyn ChecksumIndex>,
	storage: Option<&'a dyn StorageBackend>,
}

impl<'a> FileCopyOptimizer<'a> {
	/// Copy detection limited to the server versions of the current round
	pub fn new(server_versions: &'a [FileVersion]) -> Self {
		FileCopyOptimizer { server_versions, target_folder: None, index: None, storage: None }
	}

	/// Also consult the checksum index, validating candidates with `storage`
	pub fn with_index(mut self, index: &'a dyn ChecksumIndex, storage: &'a dyn StorageBackend) -> Self {
		self.index = Some(index);
		self.storage = Some(storage);
		self
	}

	/// Folder the uploads go to; index entries for the upload target itself
	/// are never used as a copy source.
	pub fn with_target_folder(mut self, folder_id: &str) -> Self {
		self.target_folder = Some(folder_id.to_string());
		self
	}

	/// `removed` are the server files removed in the same round; removes run
	/// before copies, so they cannot be copy sources.
	fn find_copy(
		&self,
		uploaded: &FileVersion,
		cause: Cause,
		removed: &[&FileVersion],
	) -> Option<DriveAction<FileVersion>> {
		if let Some(source) = self.server_versions.iter().find(|v| {
			v.checksum == uploaded.checksum && v.name != uploaded.name && !removed.contains(v)
		}) {
			debug!("Upload {} matches server file {}", uploaded.name, source.name);
			return Some(DriveAction::Copy {
				source: source.clone(),
				new: uploaded.clone(),
				location: None,
				cause,
			});
		}

		let candidate = self.find_indexed(uploaded, removed)?;
		debug!(
			"Upload {} matches stored file {}/{}",
			uploaded.name, candidate.folder_id, candidate.file_id
		);
		Some(DriveAction::Copy {
			source: FileVersion { name: candidate.name.clone(), checksum: candidate.checksum.clone() },
			new: uploaded.clone(),
			location: Some(candidate.location()),
			cause,
		})
	}

	/// First index candidate that still matches the stored file
	fn find_indexed(&self, uploaded: &FileVersion, removed: &[&FileVersion]) -> Option<FileDescriptor> {
		let (index, storage) = match (self.index, self.storage) {
			(Some(index), Some(storage)) => (index, storage),
			_ => return None,
		};

		let candidates = match index.find_by_checksum(&uploaded.checksum) {
			Ok(candidates) => candidates,
			Err(e) => {
				warn!("Checksum lookup for {} failed: {}", uploaded.name, e);
				return None;
			}
		};

		for candidate in candidates {
			if self.is_upload_target(&candidate, uploaded) || self.is_removed(&candidate, removed) {
				continue;
			}
			match storage.get_file(&candidate.folder_id, &candidate.file_id, None) {
				Ok(file) if file.sequence == candidate.sequence => return Some(candidate),
				Ok(file) => {
					debug!(
						"Index entry {}/{} is stale (sequence {} != {})",
						candidate.folder_id, candidate.file_id, candidate.sequence, file.sequence
					);
					invalidate(index, &candidate);
				}
				Err(StorageError::NotFound { .. }) => {
					debug!("Index entry {}/{} no longer exists", candidate.folder_id, candidate.file_id);
					invalidate(index, &candidate);
				}
				Err(e) => {
					warn!("Validating copy source for {} failed: {}", uploaded.name, e);
					return None;
				}
			}
		}
		None
	}

	fn is_upload_target(&self, candidate: &FileDescriptor, uploaded: &FileVersion) -> bool {
		match &self.target_folder {
			Some(folder) => candidate.folder_id == *folder && candidate.name == uploaded.name,
			None => false,
		}
	}

	fn is_removed(&self, candidate: &FileDescriptor, removed: &[&FileVersion]) -> bool {
		match &self.target_folder {
			Some(folder) => {
				candidate.folder_id == *folder
					&& removed.iter().any(|v| v.name == candidate.name && v.checksum == candidate.checksum)
			}
			None => false,
		}
	}
}

fn invalidate(index: &dyn ChecksumIndex, candidate: &FileDescriptor) {
	if let Err(e) = index.invalidate(candidate) {
		warn!("Invalidating index entry {}/{} failed: {}", candidate.folder_id, candidate.file_id, e);
	}
}

impl<'a> Optimizer<FileVersion> for FileCopyOptimizer<'a> {
	fn name(&self) -> &'static str {
		"file-copy"
	}

	fn optimize(
		&self,
		result: &SyncResult<FileVersion>,
	) -> Result<SyncResult<FileVersion>, OptimizationError> {
		let removed: Vec<&FileVersion> = result
			.actions_for_server
			.iter()
			.filter_map(|action| match action {
				DriveAction::Remove { old, .. } => Some(old),
				_ => None,
			})
			.collect();

		let mut server = result.actions_for_server.clone();
		let mut client = Vec::with_capacity(result.actions_for_client.len());

		for action in &result.actions_for_client {
			if let DriveAction::Upload { old, new, cause } = action {
				if let Some(copy) = self.find_copy(new, *cause, &removed) {
					client.push(DriveAction::acknowledge(old.clone(), Some(new.clone()), *cause));
					server.push(copy);
					continue;
				}
			}
			client.push(action.clone());
		}

		Ok(SyncResult::new(server, client))
	}
}


// vim: ts=4
