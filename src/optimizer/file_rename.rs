//! Detection of disguised file renames
//!
//! The diff reports a rename as an unrelated upload of the new name, a
//! server remove of the old name and a client acknowledge of that remove.
//! This pass folds such triples into a server-side edit so the content is
//! not transferred again. It also merges remove + download pairs of the
//! same content inside one action list into a single edit.

use super::Optimizer;
use crate::error::OptimizationError;
use crate::logging::*;
use crate::types::{DriveAction, DriveVersion, FileVersion, SyncResult};

pub struct FileRenameOptimizer;

impl Optimizer<FileVersion> for FileRenameOptimizer {
	fn name(&self) -> &'static str {
		"file-rename"
	}

	fn optimize(
		&self,
		result: &SyncResult<FileVersion>,
	) -> Result<SyncResult<FileVersion>, OptimizationError> {
		let (server, client) =
			collapse_upload_renames(&result.actions_for_server, &result.actions_for_client);
		Ok(SyncResult::new(merge_remove_download(server), merge_remove_download(client)))
	}
}

/// Fold upload + server remove + client acknowledge of the same content
///
/// Candidates are taken in list order and the first match wins. A remove or
/// acknowledge that was already consumed cannot match again.
fn collapse_upload_renames(
	server: &[DriveAction<FileVersion>],
	client: &[DriveAction<FileVersion>],
) -> (Vec<DriveAction<FileVersion>>, Vec<DriveAction<FileVersion>>) {
	let mut server = server.to_vec();
	let mut client = client.to_vec();

	let mut i = 0;
	while i < client.len() {
		let (uploaded, cause) = match &client[i] {
			DriveAction::Upload { new, cause, .. } => (new.clone(), *cause),
			_ => {
				i += 1;
				continue;
			}
		};

		let found = server.iter().enumerate().find_map(|(pos, action)| match action {
			DriveAction::Remove { old, .. } if old.checksum() == uploaded.checksum() => {
				Some((pos, old.clone()))
			}
			_ => None,
		});
		let (remove_pos, removed) = match found {
			Some(found) => found,
			None => {
				i += 1;
				continue;
			}
		};

		// Acknowledges without an old version cannot stand for a remove
		let ack_pos = match client.iter().position(|action| match action {
			DriveAction::Acknowledge { old: Some(old), .. } => old.matches(&removed),
			_ => false,
		}) {
			Some(pos) => pos,
			None => {
				i += 1;
				continue;
			}
		};

		debug!("Collapsing rename {} -> {}", removed.name, uploaded.name);
		server[remove_pos] = DriveAction::edit(removed.clone(), uploaded.clone(), cause);
		client[i] = DriveAction::acknowledge(Some(removed), Some(uploaded), cause);
		client.remove(ack_pos);
		if ack_pos < i {
			i -= 1;
		}
		i += 1;
	}

	(server, client)
}

/// Replace a remove and a download of the same content with one edit
fn merge_remove_download(actions: Vec<DriveAction<FileVersion>>) -> Vec<DriveAction<FileVersion>> {
	let mut actions = actions;
	let mut orphans = Vec::new();

	let mut i = 0;
	while i < actions.len() {
		let (removed, cause) = match &actions[i] {
			DriveAction::Remove { old, cause, .. } => (old.clone(), *cause),
			_ => {
				i += 1;
				continue;
			}
		};

		let found = actions.iter().enumerate().find_map(|(pos, action)| match action {
			DriveAction::Download { new, .. } if new.checksum() == removed.checksum() => {
				Some((pos, new.clone()))
			}
			_ => None,
		});
		let (download_pos, downloaded) = match found {
			Some(found) => found,
			None => {
				i += 1;
				continue;
			}
		};

		debug!("Merging remove {} and download {} into edit", removed.name, downloaded.name);
		let replaced = std::mem::replace(&mut actions[i], DriveAction::edit(removed, downloaded, cause));
		if let DriveAction::Remove { orphaned_descendants, .. } = replaced {
			orphans.extend(orphaned_descendants);
		}
		actions.remove(download_pos);
		if download_pos < i {
			i -= 1;
		}
		i += 1;
	}

	actions.extend(orphans);
	actions
}


// vim: ts=4
