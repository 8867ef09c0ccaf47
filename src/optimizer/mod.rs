//! Optimizer passes and the pipeline that composes them
//!
//! Every pass is a pure transform from one `SyncResult` to a new one. The
//! pipeline runs them in a fixed sequence:
//!
//! - files: rename, copy, order
//! - directories: rename, layout (removes + rename propagation), order
//!
//! A pass that fails is skipped: the pipeline logs the error and carries the
//! result from before that pass forward, so optimization never aborts a
//! sync round.

pub mod directory_rename;
pub mod file_copy;
pub mod file_rename;
pub mod order;

pub use self::directory_rename::{calculate_similarity, effective_renames, DirectoryRenameOptimizer};
pub use self::file_copy::FileCopyOptimizer;
pub use self::file_rename::FileRenameOptimizer;
pub use self::order::{
	layout_removes, order_actions, propagate_renames, DirectoryLayoutOptimizer, EditOrder,
	OrderOptimizer,
};

use crate::config::OptimizerConfig;
use crate::error::OptimizationError;
use crate::index::ChecksumIndex;
use crate::logging::*;
use crate::storage::StorageBackend;
use crate::types::{DirectoryVersion, FileVersion, SyncResult};

/// A single rewrite pass over a sync result
pub trait Optimizer<V> {
	/// Short name used in logs
	fn name(&self) -> &'static str;

	/// Produce an optimized copy of `result`; the input is left untouched.
	fn optimize(&self, result: &SyncResult<V>) -> Result<SyncResult<V>, OptimizationError>;
}

/// Run `passes` in order, falling back to the previous result when a pass fails
pub fn run_passes<V>(passes: &[&dyn Optimizer<V>], raw: &SyncResult<V>) -> SyncResult<V>
where
	V: Clone,
{
	let mut current = raw.clone();
	for pass in passes {
		match pass.optimize(&current) {
			Ok(next) => {
				debug!(
					"{}: {} -> {} actions",
					pass.name(),
					current.total_actions(),
					next.total_actions()
				);
				current = next;
			}
			Err(e) => {
				warn!("Optimizer pass {} failed, keeping previous result: {}", pass.name(), e);
			}
		}
	}
	current
}

/// Composes the optimizer passes for one sync round
pub struct Pipeline<'a> {
	config: OptimizerConfig,
	index: Option<&'a dyn ChecksumIndex>,
	storage: Option<&'a dyn StorageBackend>,
}

impl<'a> Pipeline<'a> {
	pub fn new(config: OptimizerConfig) -> Self {
		Pipeline { config, index: None, storage: None }
	}

	/// Use a checksum index for copy detection
	pub fn with_index(mut self, index: &'a dyn ChecksumIndex) -> Self {
		self.index = Some(index);
		self
	}

	/// Use a storage backend to validate checksum index candidates
	pub fn with_storage(mut self, storage: &'a dyn StorageBackend) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn config(&self) -> &OptimizerConfig {
		&self.config
	}

	/// Optimize the file actions of a round
	///
	/// `server_versions` are the server files already known in this round,
	/// `folder_id` identifies the synchronized folder in the storage backend.
	pub fn optimize_files(
		&self,
		raw: &SyncResult<FileVersion>,
		server_versions: &[FileVersion],
		folder_id: Option<&str>,
	) -> SyncResult<FileVersion> {
		if raw.is_empty() {
			return raw.clone();
		}

		let rename = FileRenameOptimizer;
		let mut copy = FileCopyOptimizer::new(server_versions);
		if let Some(folder_id) = folder_id {
			copy = copy.with_target_folder(folder_id);
		}
		if let (Some(index), Some(storage)) = (self.index, self.storage) {
			copy = copy.with_index(index, storage);
		}
		let order = OrderOptimizer::new(EditOrder::TargetDescending);

		let mut passes: Vec<&dyn Optimizer<FileVersion>> = Vec::new();
		if self.config.file_renames {
			passes.push(&rename);
		}
		if self.config.copies {
			passes.push(&copy);
		}
		if self.config.ordering {
			passes.push(&order);
		}

		let optimized = run_passes(&passes, raw);
		info!("Optimized file actions: {} -> {}", raw.total_actions(), optimized.total_actions());
		optimized
	}

	/// Optimize the directory actions of a round
	pub fn optimize_directories(
		&self,
		raw: &SyncResult<DirectoryVersion>,
	) -> SyncResult<DirectoryVersion> {
		if raw.is_empty() {
			return raw.clone();
		}

		let rename = DirectoryRenameOptimizer;
		let layout = DirectoryLayoutOptimizer;
		let order = OrderOptimizer::new(EditOrder::Sequence);

		let mut passes: Vec<&dyn Optimizer<DirectoryVersion>> = Vec::new();
		if self.config.directory_renames {
			passes.push(&rename);
		}
		if self.config.ordering {
			passes.push(&layout);
			passes.push(&order);
		}

		let optimized = run_passes(&passes, raw);
		info!(
			"Optimized directory actions: {} -> {}",
			raw.total_actions(),
			optimized.total_actions()
		);
		optimized
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Cause, DriveAction};

	struct FailingPass;

	impl Optimizer<FileVersion> for FailingPass {
		fn name(&self) -> &'static str {
			"failing"
		}

		fn optimize(
			&self,
			_result: &SyncResult<FileVersion>,
		) -> Result<SyncResult<FileVersion>, OptimizationError> {
			Err(OptimizationError::StructuralMismatch {
				pass: "failing",
				message: "always fails".to_string(),
			})
		}
	}

	fn upload(name: &str, checksum: &str) -> DriveAction<FileVersion> {
		DriveAction::Upload { old: None, new: FileVersion::new(name, checksum), cause: Cause::CLIENT_NEW }
	}

	#[test]
	fn test_failing_pass_falls_back() {
		let raw = SyncResult::new(
			vec![DriveAction::remove(FileVersion::new("a.txt", "k1"), Cause::SERVER_DELETED)],
			vec![upload("b.txt", "k2"), upload("a.txt", "k3")],
		);
		let order = OrderOptimizer::new(EditOrder::TargetDescending);

		let with_failure: [&dyn Optimizer<FileVersion>; 2] = [&FailingPass, &order];
		let without: [&dyn Optimizer<FileVersion>; 1] = [&order];
		assert_eq!(run_passes(&with_failure, &raw), run_passes(&without, &raw));
	}

	#[test]
	fn test_failing_layout_keeps_round() {
		let pipeline = Pipeline::new(OptimizerConfig::default());
		let raw = SyncResult::new(
			vec![
				DriveAction::remove(DirectoryVersion::new("/a", "h1"), Cause::default()),
				DriveAction::remove(DirectoryVersion::new("/a/b", "h2"), Cause::default()),
				DriveAction::edit(
					DirectoryVersion::new("/x", "h3"),
					DirectoryVersion::new("/x/y", "h3"),
					Cause::default(),
				),
			],
			vec![],
		);
		// Layout rejects the edit; the round continues with the remaining passes
		assert_eq!(pipeline.optimize_directories(&raw), raw);
	}

	#[test]
	fn test_empty_round_is_noop() {
		let pipeline = Pipeline::new(OptimizerConfig::default());
		let raw: SyncResult<FileVersion> = SyncResult::empty();
		assert!(pipeline.optimize_files(&raw, &[], None).is_empty());
		let raw: SyncResult<DirectoryVersion> = SyncResult::empty();
		assert!(pipeline.optimize_directories(&raw).is_empty());
	}

	#[test]
	fn test_disabled_passes_leave_actions() {
		let config = OptimizerConfig {
			file_renames: false,
			copies: false,
			ordering: false,
			..OptimizerConfig::default()
		};
		let pipeline = Pipeline::new(config);
		let raw = SyncResult::new(
			vec![DriveAction::remove(FileVersion::new("a.txt", "k1"), Cause::CLIENT_DELETED)],
			vec![
				upload("b.txt", "k1"),
				DriveAction::acknowledge(Some(FileVersion::new("a.txt", "k1")), None, Cause::CLIENT_DELETED),
			],
		);
		assert_eq!(pipeline.optimize_files(&raw, &[], None), raw);
	}
}

// vim: ts=4
