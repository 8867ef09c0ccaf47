//! Execution order of actions
//!
//! Executors apply actions front to back and rely on this ordering:
//!
//! - kinds are ordered by `ActionKind::rank`
//! - directory removes run children before parents
//! - directory renames run parents before children, with old paths rewritten
//!   to account for renames that ran earlier in the same batch

use std::cmp::Ordering;

use super::Optimizer;
use crate::error::OptimizationError;
use crate::logging::*;
use crate::types::{DirectoryVersion, DriveAction, DriveVersion, SyncResult};

/// How edits of equal rank are ordered among each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOrder {
	/// Target name/path in descending order, ancestors before descendants
	TargetDescending,

	/// Keep the order established by an earlier pass
	Sequence,
}

/// Sorts both action lists into execution order
pub struct OrderOptimizer {
	edit_order: EditOrder,
}

impl OrderOptimizer {
	pub fn new(edit_order: EditOrder) -> Self {
		OrderOptimizer { edit_order }
	}
}

impl<V: DriveVersion> Optimizer<V> for OrderOptimizer {
	fn name(&self) -> &'static str {
		"order"
	}

	fn optimize(&self, result: &SyncResult<V>) -> Result<SyncResult<V>, OptimizationError> {
		Ok(SyncResult::new(
			order_actions(&result.actions_for_server, self.edit_order),
			order_actions(&result.actions_for_client, self.edit_order),
		))
	}
}

/// Stable sort by kind rank, with the edit tie-break applied to edits
pub fn order_actions<V: DriveVersion>(
	actions: &[DriveAction<V>],
	edit_order: EditOrder,
) -> Vec<DriveAction<V>> {
	let mut ordered = actions.to_vec();
	ordered.sort_by(|a, b| compare_actions(a, b, edit_order));
	ordered
}

fn compare_actions<V: DriveVersion>(a: &DriveAction<V>, b: &DriveAction<V>, edit_order: EditOrder) -> Ordering {
	match a.kind().rank().cmp(&b.kind().rank()) {
		Ordering::Equal => {}
		other => return other,
	}
	match (a, b, edit_order) {
		(
			DriveAction::Edit { new: new_a, .. },
			DriveAction::Edit { new: new_b, .. },
			EditOrder::TargetDescending,
		) => compare_targets(new_a.identity(), new_b.identity()),
		_ => Ordering::Equal,
	}
}

/// Segment-wise descending comparison where an ancestor precedes its
/// descendants. For plain file names this is descending order.
fn compare_targets(a: &str, b: &str) -> Ordering {
	let mut left = a.split('/');
	let mut right = b.split('/');
	loop {
		match (left.next(), right.next()) {
			(Some(l), Some(r)) => match r.cmp(l) {
				Ordering::Equal => continue,
				other => return other,
			},
			(None, Some(_)) => return Ordering::Less,
			(Some(_), None) => return Ordering::Greater,
			(None, None) => return Ordering::Equal,
		}
	}
}

/// Runs `layout_removes` and `propagate_renames` on both lists
pub struct DirectoryLayoutOptimizer;

impl Optimizer<DirectoryVersion> for DirectoryLayoutOptimizer {
	fn name(&self) -> &'static str {
		"directory-layout"
	}

	fn optimize(
		&self,
		result: &SyncResult<DirectoryVersion>,
	) -> Result<SyncResult<DirectoryVersion>, OptimizationError> {
		check_renames(&result.actions_for_server)?;
		check_renames(&result.actions_for_client)?;
		let layout = |actions: &[DriveAction<DirectoryVersion>]| {
			propagate_renames(&layout_removes(actions))
		};
		Ok(SyncResult::new(layout(&result.actions_for_server), layout(&result.actions_for_client)))
	}
}

/// A directory cannot be moved into its own subtree; rewriting descendants
/// under such a rename would never terminate at a valid path.
fn check_renames(actions: &[DriveAction<DirectoryVersion>]) -> Result<(), OptimizationError> {
	for action in actions {
		if let DriveAction::Edit { old, new, .. } = action {
			let inside = new.path.strip_prefix(old.path.as_str()).map_or(false, |rest| rest.starts_with('/'));
			if inside {
				return Err(OptimizationError::StructuralMismatch {
					pass: "directory-layout",
					message: format!("{} moved into its own subtree {}", old.path, new.path),
				});
			}
		}
	}
	Ok(())
}

/// Order removes by path descending so children are removed before parents
///
/// Only the relative order of removes changes; they keep the positions
/// removes occupied in the list.
pub fn layout_removes(actions: &[DriveAction<DirectoryVersion>]) -> Vec<DriveAction<DirectoryVersion>> {
	let mut removes: Vec<DriveAction<DirectoryVersion>> =
		actions.iter().filter(|a| matches!(a, DriveAction::Remove { .. })).cloned().collect();
	removes.sort_by(|a, b| old_path(b).cmp(old_path(a)));

	let mut removes = removes.into_iter();
	actions
		.iter()
		.map(|action| match action {
			DriveAction::Remove { .. } => removes.next().unwrap_or_else(|| action.clone()),
			_ => action.clone(),
		})
		.collect()
}

/// Order renames parents first and rewrite old paths below renamed parents
///
/// Every rename was computed against the same snapshot, so once a parent
/// rename has run its descendants live under the new name. Renames keep the
/// positions renames occupied in the list.
pub fn propagate_renames(
	actions: &[DriveAction<DirectoryVersion>],
) -> Vec<DriveAction<DirectoryVersion>> {
	let mut edits: Vec<DriveAction<DirectoryVersion>> =
		actions.iter().filter(|a| matches!(a, DriveAction::Edit { .. })).cloned().collect();
	edits.sort_by(|a, b| old_path(a).cmp(old_path(b)));

	let mut committed: Vec<(String, String)> = Vec::new();
	let mut rewritten = Vec::with_capacity(edits.len());
	for edit in edits {
		let (old, new, cause) = match edit {
			DriveAction::Edit { old, new, cause } => (old, new, cause),
			other => {
				rewritten.push(other);
				continue;
			}
		};
		let mut path = old.path.clone();
		for (from, to) in &committed {
			if let Some(rest) = path.strip_prefix(from.as_str()) {
				if rest.starts_with('/') {
					path = format!("{}{}", to, rest);
				}
			}
		}
		if path != old.path {
			debug!("Rewriting rename source {} -> {}", old.path, path);
		}
		committed.push((path.clone(), new.path.clone()));
		let old = DirectoryVersion { path, checksum: old.checksum };
		rewritten.push(DriveAction::Edit { old, new, cause });
	}

	let mut rewritten = rewritten.into_iter();
	actions
		.iter()
		.map(|action| match action {
			DriveAction::Edit { .. } => rewritten.next().unwrap_or_else(|| action.clone()),
			_ => action.clone(),
		})
		.collect()
}

fn old_path(action: &DriveAction<DirectoryVersion>) -> &str {
	action.old_version().map(|v| v.path.as_str()).unwrap_or("")
}


// vim: ts=4
