//! Detection of directory moves
//!
//! A directory moved at the client shows up as a server remove and a client
//! acknowledge of the old path plus a client sync of the new path with the
//! same checksum. A directory moved at the server shows up as a client remove
//! plus a client sync. Both are folded into edits. When several new
//! directories carry the checksum of a removed one, the one whose path is
//! most similar to the old path is chosen.

use super::Optimizer;
use crate::error::OptimizationError;
use crate::logging::*;
use crate::types::{Cause, DirectoryVersion, DriveAction, DriveVersion, SyncResult};

/// Score returned for identical paths
pub const MAX_SIMILARITY: usize = usize::MAX;

pub struct DirectoryRenameOptimizer;

impl Optimizer<DirectoryVersion> for DirectoryRenameOptimizer {
	fn name(&self) -> &'static str {
		"directory-rename"
	}

	fn optimize(
		&self,
		result: &SyncResult<DirectoryVersion>,
	) -> Result<SyncResult<DirectoryVersion>, OptimizationError> {
		let mut server = result.actions_for_server.clone();
		let mut client = result.actions_for_client.clone();
		let mut server_renames = Vec::new();
		let mut client_renames = Vec::new();
		let mut client_acknowledges = Vec::new();

		// Moved at the client
		for action in &result.actions_for_server {
			let (removed, orphans) = match action {
				DriveAction::Remove { old, orphaned_descendants, cause }
					if *cause == Cause::CLIENT_DELETED =>
				{
					(old, orphaned_descendants)
				}
				_ => continue,
			};

			let ack_pos = client.iter().position(|a| match a {
				DriveAction::Acknowledge { old: Some(old), new: None, cause } => {
					*cause == Cause::CLIENT_DELETED && old.matches(removed)
				}
				_ => false,
			});
			let ack_pos = match ack_pos {
				Some(pos) => pos,
				None => continue,
			};
			let sync_pos = match best_sync_match(&client, removed, Cause::CLIENT_NEW) {
				Some(pos) => pos,
				None => continue,
			};
			let moved_to = sync_target(&client[sync_pos])?;

			debug!("Directory moved at client: {} -> {}", removed.path, moved_to.path);
			if let Some(pos) = server.iter().position(|a| a == action) {
				server.remove(pos);
			}
			// The directory still exists under its new name; only the
			// descendants that were really deleted are removed.
			server.extend(orphans.iter().cloned());

			// Drop the higher index first so the other one stays valid
			let (first, second) = if ack_pos > sync_pos { (ack_pos, sync_pos) } else { (sync_pos, ack_pos) };
			client.remove(first);
			client.remove(second);

			server_renames.push(DriveAction::edit(removed.clone(), moved_to.clone(), Cause::CLIENT_NEW));
			client_acknowledges.push(DriveAction::acknowledge(
				Some(removed.clone()),
				Some(moved_to),
				Cause::CLIENT_NEW,
			));
		}

		// Moved at the server
		for action in &result.actions_for_client {
			let (removed, orphans) = match action {
				DriveAction::Remove { old, orphaned_descendants, cause }
					if *cause == Cause::SERVER_DELETED =>
				{
					(old, orphaned_descendants)
				}
				_ => continue,
			};
			let remove_pos = match client.iter().position(|a| a == action) {
				Some(pos) => pos,
				None => continue,
			};
			let sync_pos = match best_sync_match(&client, removed, Cause::SERVER_NEW) {
				Some(pos) => pos,
				None => continue,
			};
			let moved_to = sync_target(&client[sync_pos])?;

			debug!("Directory moved at server: {} -> {}", removed.path, moved_to.path);
			let (first, second) =
				if remove_pos > sync_pos { (remove_pos, sync_pos) } else { (sync_pos, remove_pos) };
			client.remove(first);
			client.remove(second);
			client.extend(orphans.iter().cloned());

			client_renames.push(DriveAction::edit(removed.clone(), moved_to, Cause::SERVER_NEW));
		}

		server.extend(effective_renames(&server_renames));
		client.extend(effective_renames(&client_renames));
		client.extend(client_acknowledges);

		Ok(SyncResult::new(server, client))
	}
}

fn sync_target(action: &DriveAction<DirectoryVersion>) -> Result<DirectoryVersion, OptimizationError> {
	match action {
		DriveAction::Sync { new, .. } => Ok(new.clone()),
		other => Err(OptimizationError::StructuralMismatch {
			pass: "directory-rename",
			message: format!("expected a sync action, found {}", other),
		}),
	}
}

/// Position of the sync action with matching cause and checksum whose path
/// is most similar to `removed`. Ties go to the earliest candidate.
fn best_sync_match(
	actions: &[DriveAction<DirectoryVersion>],
	removed: &DirectoryVersion,
	wanted: Cause,
) -> Option<usize> {
	let mut best: Option<(usize, usize)> = None;
	for (pos, action) in actions.iter().enumerate() {
		let candidate = match action {
			DriveAction::Sync { new, cause } if *cause == wanted => new,
			_ => continue,
		};
		if candidate.checksum() != removed.checksum() {
			continue;
		}
		let score = calculate_similarity(Some(&removed.path), Some(&candidate.path));
		match best {
			Some((_, best_score)) if score <= best_score => {}
			_ => best = Some((pos, score)),
		}
	}
	best.map(|(pos, _)| pos)
}

/// Unweighted similarity of two slash-delimited paths
///
/// Counts equal segments at the same position scanning from the front, plus
/// equal segments scanning from the back, both up to the shorter length.
/// Identical paths (or two absent paths) score `MAX_SIMILARITY`.
///
/// Paths are split verbatim, without normalization: a trailing slash adds an
/// empty last segment and the root `/` is two empty segments. Directory paths
/// are expected in canonical form (leading slash, no trailing slash).
pub fn calculate_similarity(path1: Option<&str>, path2: Option<&str>) -> usize {
	let (path1, path2) = match (path1, path2) {
		(None, None) => return MAX_SIMILARITY,
		(Some(p1), Some(p2)) if p1 == p2 => return MAX_SIMILARITY,
		(Some(p1), Some(p2)) => (p1, p2),
		_ => return 0,
	};

	let segments1: Vec<&str> = path1.split('/').collect();
	let segments2: Vec<&str> = path2.split('/').collect();
	let length = segments1.len().min(segments2.len());

	let front = (0..length).filter(|&i| segments1[i] == segments2[i]).count();
	let back = (1..=length)
		.filter(|&i| segments1[segments1.len() - i] == segments2[segments2.len() - i])
		.count();
	front + back
}

/// Drop renames that are implied by the rename of an ancestor
///
/// Renames are sorted by new path, then each one is kept unless an already
/// kept rename moves its parent so that it lands at the same relative spot.
pub fn effective_renames(
	renames: &[DriveAction<DirectoryVersion>],
) -> Vec<DriveAction<DirectoryVersion>> {
	let mut sorted: Vec<&DriveAction<DirectoryVersion>> = renames.iter().collect();
	sorted.sort_by(|a, b| new_path(a).cmp(new_path(b)));

	let mut effective: Vec<DriveAction<DirectoryVersion>> = Vec::new();
	for rename in sorted {
		let (old, new) = match rename {
			DriveAction::Edit { old, new, .. } => (old.path.as_str(), new.path.as_str()),
			other => {
				effective.push(other.clone());
				continue;
			}
		};
		let implied = effective.iter().any(|accepted| match accepted {
			DriveAction::Edit { old: e_old, new: e_new, .. } => {
				match (strip_parent(old, &e_old.path), strip_parent(new, &e_new.path)) {
					(Some(old_rest), Some(new_rest)) => old_rest == new_rest,
					_ => false,
				}
			}
			_ => false,
		});
		if implied {
			debug!("Dropping rename {} -> {}, implied by a parent rename", old, new);
		} else {
			effective.push(rename.clone());
		}
	}
	effective
}

fn new_path(action: &DriveAction<DirectoryVersion>) -> &str {
	action.new_version().map(|v| v.path.as_str()).unwrap_or("")
}

/// Remainder of `path` below `parent`, if `path` is a strict descendant
fn strip_parent<'p>(path: &'p str, parent: &str) -> Option<&'p str> {
	path.strip_prefix(parent).and_then(|rest| rest.strip_prefix('/'))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ActionKind;

	fn d(path: &str, checksum: &str) -> DirectoryVersion {
		DirectoryVersion::new(path, checksum)
	}

	fn sync(path: &str, checksum: &str, cause: Cause) -> DriveAction<DirectoryVersion> {
		DriveAction::Sync { new: d(path, checksum), cause }
	}

	#[test]
	fn test_similarity_identical_paths() {
		assert_eq!(calculate_similarity(Some("/a/b"), Some("/a/b")), MAX_SIMILARITY);
		assert_eq!(calculate_similarity(None, None), MAX_SIMILARITY);
		assert_eq!(calculate_similarity(Some("/a"), None), 0);
	}

	#[test]
	fn test_similarity_counts_front_and_back() {
		// front: "", "b"; back: "b", ""
		assert_eq!(calculate_similarity(Some("/a/b"), Some("/x/b")), 4);
		// front: "", "docs"; back: "report" vs "docs", "2019" vs "" -> 0
		assert_eq!(calculate_similarity(Some("/docs/2019/report"), Some("/docs")), 2);
		// front: ""; back: ""
		assert_eq!(calculate_similarity(Some("/Projects"), Some("/Work")), 2);
	}

	#[test]
	fn test_similarity_splits_verbatim() {
		// "/a/" is ["", "a", ""]: front "", "a"; back "" vs "a", "a" vs "" -> 0
		assert_eq!(calculate_similarity(Some("/a/"), Some("/a")), 2);
		// "/" is ["", ""]: front ""; back "" vs "" at the second-to-last position
		assert_eq!(calculate_similarity(Some("/"), Some("/a")), 2);
		assert_eq!(calculate_similarity(Some("/"), Some("/")), MAX_SIMILARITY);
	}

	#[test]
	fn test_client_side_move() {
		let raw = SyncResult::new(
			vec![DriveAction::remove(d("/Projects", "H1"), Cause::CLIENT_DELETED)],
			vec![
				DriveAction::acknowledge(Some(d("/Projects", "H1")), None, Cause::CLIENT_DELETED),
				sync("/Work", "H1", Cause::CLIENT_NEW),
			],
		);
		let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();

		assert_eq!(
			result.actions_for_server,
			vec![DriveAction::edit(d("/Projects", "H1"), d("/Work", "H1"), Cause::CLIENT_NEW)]
		);
		assert_eq!(
			result.actions_for_client,
			vec![DriveAction::acknowledge(
				Some(d("/Projects", "H1")),
				Some(d("/Work", "H1")),
				Cause::CLIENT_NEW
			)]
		);
	}

	#[test]
	fn test_client_side_move_reinserts_orphaned_removes() {
		let nested = DriveAction::remove(d("/Projects/tmp", "H9"), Cause::CLIENT_DELETED);
		let raw = SyncResult::new(
			vec![DriveAction::Remove {
				old: d("/Projects", "H1"),
				orphaned_descendants: vec![nested.clone()],
				cause: Cause::CLIENT_DELETED,
			}],
			vec![
				DriveAction::acknowledge(Some(d("/Projects", "H1")), None, Cause::CLIENT_DELETED),
				sync("/Work", "H1", Cause::CLIENT_NEW),
			],
		);
		let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();

		assert_eq!(result.actions_for_server.len(), 2);
		assert_eq!(result.actions_for_server[0], nested);
		assert_eq!(result.actions_for_server[1].kind(), ActionKind::Edit);
	}

	#[test]
	fn test_client_side_move_needs_acknowledge() {
		let raw = SyncResult::new(
			vec![DriveAction::remove(d("/Projects", "H1"), Cause::CLIENT_DELETED)],
			vec![sync("/Work", "H1", Cause::CLIENT_NEW)],
		);
		assert_eq!(DirectoryRenameOptimizer.optimize(&raw).unwrap(), raw);
	}

	#[test]
	fn test_client_side_move_skips_acknowledge_without_old_version() {
		let raw = SyncResult::new(
			vec![DriveAction::remove(d("/Projects", "H1"), Cause::CLIENT_DELETED)],
			vec![
				DriveAction::acknowledge(None, None, Cause::CLIENT_DELETED),
				sync("/Work", "H1", Cause::CLIENT_NEW),
			],
		);
		assert_eq!(DirectoryRenameOptimizer.optimize(&raw).unwrap(), raw);
	}

	#[test]
	fn test_server_side_move_reinserts_orphaned_removes() {
		let nested = DriveAction::remove(d("/Inbox/tmp", "H9"), Cause::SERVER_DELETED);
		let raw = SyncResult::new(
			vec![],
			vec![
				DriveAction::Remove {
					old: d("/Inbox", "H2"),
					orphaned_descendants: vec![nested.clone()],
					cause: Cause::SERVER_DELETED,
				},
				sync("/Archive", "H2", Cause::SERVER_NEW),
			],
		);
		let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();

		assert_eq!(
			result.actions_for_client,
			vec![nested, DriveAction::edit(d("/Inbox", "H2"), d("/Archive", "H2"), Cause::SERVER_NEW)]
		);
		assert!(result.actions_for_server.is_empty());
	}

	#[test]
	fn test_server_side_move() {
		let raw = SyncResult::new(
			vec![],
			vec![
				DriveAction::remove(d("/Inbox/2019", "H2"), Cause::SERVER_DELETED),
				sync("/Archive/2019", "H2", Cause::SERVER_NEW),
			],
		);
		let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();
		assert_eq!(
			result.actions_for_client,
			vec![DriveAction::edit(d("/Inbox/2019", "H2"), d("/Archive/2019", "H2"), Cause::SERVER_NEW)]
		);
		assert!(result.actions_for_server.is_empty());
	}

	#[test]
	fn test_most_similar_candidate_wins() {
		let raw = SyncResult::new(
			vec![],
			vec![
				DriveAction::remove(d("/a/photos", "H"), Cause::SERVER_DELETED),
				sync("/x/other", "H", Cause::SERVER_NEW),
				sync("/b/photos", "H", Cause::SERVER_NEW),
			],
		);
		let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();
		assert!(result.actions_for_client.contains(&DriveAction::edit(
			d("/a/photos", "H"),
			d("/b/photos", "H"),
			Cause::SERVER_NEW
		)));
		assert!(result.actions_for_client.contains(&sync("/x/other", "H", Cause::SERVER_NEW)));
	}

	#[test]
	fn test_tie_goes_to_first_candidate() {
		let raw = SyncResult::new(
			vec![],
			vec![
				DriveAction::remove(d("/a", "H"), Cause::SERVER_DELETED),
				sync("/b", "H", Cause::SERVER_NEW),
				sync("/c", "H", Cause::SERVER_NEW),
			],
		);
		for _ in 0..3 {
			let result = DirectoryRenameOptimizer.optimize(&raw).unwrap();
			assert_eq!(
				result.actions_for_client,
				vec![
					sync("/c", "H", Cause::SERVER_NEW),
					DriveAction::edit(d("/a", "H"), d("/b", "H"), Cause::SERVER_NEW),
				]
			);
		}
	}

	#[test]
	fn test_redundant_rename_dropped() {
		let renames = vec![
			DriveAction::edit(d("/a/c", "H2"), d("/b/c", "H2"), Cause::SERVER_NEW),
			DriveAction::edit(d("/a", "H1"), d("/b", "H1"), Cause::SERVER_NEW),
		];
		let effective = effective_renames(&renames);
		assert_eq!(effective, vec![DriveAction::edit(d("/a", "H1"), d("/b", "H1"), Cause::SERVER_NEW)]);
	}

	#[test]
	fn test_nested_rename_with_new_name_kept() {
		let renames = vec![
			DriveAction::edit(d("/a", "H1"), d("/b", "H1"), Cause::SERVER_NEW),
			DriveAction::edit(d("/a/c", "H2"), d("/b/d", "H2"), Cause::SERVER_NEW),
		];
		assert_eq!(effective_renames(&renames).len(), 2);
	}

	#[test]
	fn test_sibling_prefix_is_not_a_parent() {
		let renames = vec![
			DriveAction::edit(d("/a", "H1"), d("/b", "H1"), Cause::SERVER_NEW),
			DriveAction::edit(d("/ab/c", "H2"), d("/bb/c", "H2"), Cause::SERVER_NEW),
		];
		assert_eq!(effective_renames(&renames).len(), 2);
	}
}

// vim: ts=4
