//! Data model shared by all optimizer passes
//!
//! A sync round is described by two independent action lists, one for the
//! server and one for the client. Actions reference versions, which pair an
//! identity (file name or directory path) with a content checksum.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity plus content fingerprint of a synchronizable object
pub trait DriveVersion: Clone + PartialEq + fmt::Debug {
	/// Name (files) or slash-delimited path (directories)
	fn identity(&self) -> &str;

	/// Content checksum, equal checksums mean equal content
	fn checksum(&self) -> &str;

	/// Same identity and same content
	fn matches(&self, other: &Self) -> bool {
		self.identity() == other.identity() && self.checksum() == other.checksum()
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FileVersion {
	pub name: String,
	pub checksum: String,
}

impl FileVersion {
	pub fn new(name: &str, checksum: &str) -> Self {
		FileVersion { name: name.to_string(), checksum: checksum.to_string() }
	}
}

impl DriveVersion for FileVersion {
	fn identity(&self) -> &str {
		&self.name
	}

	fn checksum(&self) -> &str {
		&self.checksum
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DirectoryVersion {
	pub path: String,
	pub checksum: String,
}

impl DirectoryVersion {
	pub fn new(path: &str, checksum: &str) -> Self {
		DirectoryVersion { path: path.to_string(), checksum: checksum.to_string() }
	}
}

impl DriveVersion for DirectoryVersion {
	fn identity(&self) -> &str {
		&self.path
	}

	fn checksum(&self) -> &str {
		&self.checksum
	}
}

/// Change observed on one side since the last sync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Change {
	#[default]
	None,
	New,
	Modified,
	Deleted,
}

/// Why an action was generated: (client change, server change)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Cause {
	pub client: Change,
	pub server: Change,
}

impl Cause {
	pub const fn new(client: Change, server: Change) -> Self {
		Cause { client, server }
	}

	/// Deleted at the client, untouched at the server
	pub const CLIENT_DELETED: Cause = Cause::new(Change::Deleted, Change::None);

	/// Created at the client, untouched at the server
	pub const CLIENT_NEW: Cause = Cause::new(Change::New, Change::None);

	/// Deleted at the server, untouched at the client
	pub const SERVER_DELETED: Cause = Cause::new(Change::None, Change::Deleted);

	/// Created at the server, untouched at the client
	pub const SERVER_NEW: Cause = Cause::new(Change::None, Change::New);
}

/// Action kinds, declared in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
	Remove,
	Sync,
	Download,
	Upload,
	Copy,
	Edit,
	Acknowledge,
	Error,
}

impl ActionKind {
	/// Execution rank; executors must apply lower ranks first.
	pub fn rank(self) -> u8 {
		match self {
			ActionKind::Remove => 0,
			ActionKind::Sync => 1,
			ActionKind::Download => 2,
			ActionKind::Upload => 3,
			ActionKind::Copy => 4,
			ActionKind::Edit => 5,
			ActionKind::Acknowledge => 6,
			ActionKind::Error => 7,
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			ActionKind::Remove => "REMOVE",
			ActionKind::Sync => "SYNC",
			ActionKind::Download => "DOWNLOAD",
			ActionKind::Upload => "UPLOAD",
			ActionKind::Copy => "COPY",
			ActionKind::Edit => "EDIT",
			ActionKind::Acknowledge => "ACKNOWLEDGE",
			ActionKind::Error => "ERROR",
		};
		write!(f, "{}", name)
	}
}

/// Location of stored content outside the synchronized folder
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredLocation {
	pub folder_id: String,
	pub file_id: String,
}

/// One instruction for the client or the server
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", bound(deserialize = "V: Deserialize<'de>"))]
pub enum DriveAction<V> {
	Upload {
		#[serde(default)]
		old: Option<V>,
		new: V,
		#[serde(default)]
		cause: Cause,
	},
	Download {
		#[serde(default)]
		old: Option<V>,
		new: V,
		#[serde(default)]
		cause: Cause,
	},
	Remove {
		old: V,
		/// Descendant removes that were folded into this one
		#[serde(default, rename = "orphanedDescendants", skip_serializing_if = "Vec::is_empty")]
		orphaned_descendants: Vec<DriveAction<V>>,
		#[serde(default)]
		cause: Cause,
	},
	Edit {
		old: V,
		new: V,
		#[serde(default)]
		cause: Cause,
	},
	Acknowledge {
		#[serde(default)]
		old: Option<V>,
		#[serde(default)]
		new: Option<V>,
		#[serde(default)]
		cause: Cause,
	},
	Sync {
		new: V,
		#[serde(default)]
		cause: Cause,
	},
	Copy {
		source: V,
		new: V,
		#[serde(default)]
		location: Option<StoredLocation>,
		#[serde(default)]
		cause: Cause,
	},
	Error {
		#[serde(default)]
		old: Option<V>,
		#[serde(default)]
		new: Option<V>,
		message: String,
		#[serde(default)]
		quarantine: bool,
		#[serde(default)]
		cause: Cause,
	},
}

impl<V> DriveAction<V> {
	pub fn remove(old: V, cause: Cause) -> Self {
		DriveAction::Remove { old, orphaned_descendants: Vec::new(), cause }
	}

	pub fn edit(old: V, new: V, cause: Cause) -> Self {
		DriveAction::Edit { old, new, cause }
	}

	pub fn acknowledge(old: Option<V>, new: Option<V>, cause: Cause) -> Self {
		DriveAction::Acknowledge { old, new, cause }
	}

	pub fn kind(&self) -> ActionKind {
		match self {
			DriveAction::Upload { .. } => ActionKind::Upload,
			DriveAction::Download { .. } => ActionKind::Download,
			DriveAction::Remove { .. } => ActionKind::Remove,
			DriveAction::Edit { .. } => ActionKind::Edit,
			DriveAction::Acknowledge { .. } => ActionKind::Acknowledge,
			DriveAction::Sync { .. } => ActionKind::Sync,
			DriveAction::Copy { .. } => ActionKind::Copy,
			DriveAction::Error { .. } => ActionKind::Error,
		}
	}

	pub fn cause(&self) -> Cause {
		match self {
			DriveAction::Upload { cause, .. }
			| DriveAction::Download { cause, .. }
			| DriveAction::Remove { cause, .. }
			| DriveAction::Edit { cause, .. }
			| DriveAction::Acknowledge { cause, .. }
			| DriveAction::Sync { cause, .. }
			| DriveAction::Copy { cause, .. }
			| DriveAction::Error { cause, .. } => *cause,
		}
	}

	/// Version the action starts from, if any
	pub fn old_version(&self) -> Option<&V> {
		match self {
			DriveAction::Upload { old, .. }
			| DriveAction::Download { old, .. }
			| DriveAction::Acknowledge { old, .. }
			| DriveAction::Error { old, .. } => old.as_ref(),
			DriveAction::Remove { old, .. } | DriveAction::Edit { old, .. } => Some(old),
			DriveAction::Copy { source, .. } => Some(source),
			DriveAction::Sync { .. } => None,
		}
	}

	/// Version the action produces, if any
	pub fn new_version(&self) -> Option<&V> {
		match self {
			DriveAction::Upload { new, .. }
			| DriveAction::Download { new, .. }
			| DriveAction::Edit { new, .. }
			| DriveAction::Sync { new, .. }
			| DriveAction::Copy { new, .. } => Some(new),
			DriveAction::Acknowledge { new, .. } | DriveAction::Error { new, .. } => new.as_ref(),
			DriveAction::Remove { .. } => None,
		}
	}
}

impl<V: DriveVersion> fmt::Display for DriveAction<V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let old = self.old_version().map(|v| v.identity()).unwrap_or("-");
		let new = self.new_version().map(|v| v.identity()).unwrap_or("-");
		write!(f, "{} [{} -> {}]", self.kind(), old, new)
	}
}

/// Actions for both sides of one sync round
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "V: Deserialize<'de>"))]
pub struct SyncResult<V> {
	#[serde(default = "Vec::new")]
	pub actions_for_server: Vec<DriveAction<V>>,
	#[serde(default = "Vec::new")]
	pub actions_for_client: Vec<DriveAction<V>>,
}

impl<V> SyncResult<V> {
	pub fn new(actions_for_server: Vec<DriveAction<V>>, actions_for_client: Vec<DriveAction<V>>) -> Self {
		SyncResult { actions_for_server, actions_for_client }
	}

	pub fn empty() -> Self {
		SyncResult { actions_for_server: Vec::new(), actions_for_client: Vec::new() }
	}

	pub fn is_empty(&self) -> bool {
		self.actions_for_server.is_empty() && self.actions_for_client.is_empty()
	}

	pub fn total_actions(&self) -> usize {
		self.actions_for_server.len() + self.actions_for_client.len()
	}
}

impl<V> Default for SyncResult<V> {
	fn default() -> Self {
		Self::empty()
	}
}


// vim: ts=4
