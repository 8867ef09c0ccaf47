//! Persistent checksum index for copy detection
//!
//! Maps content checksums to the stored files known to carry that content.
//! Entries are hints: they may go stale whenever the referenced file changes,
//! so callers re-validate candidates against the storage backend and
//! invalidate the ones that no longer match.

use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path;

use crate::error::IndexError;
use crate::logging::*;
use crate::types::StoredLocation;

/// A stored file as recorded in the checksum index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
	#[serde(rename = "fo")]
	pub folder_id: String,
	#[serde(rename = "fi")]
	pub file_id: String,
	#[serde(rename = "nm")]
	pub name: String,
	#[serde(rename = "ck")]
	pub checksum: String,
	/// Sequence number of the file when the entry was written
	#[serde(rename = "sq")]
	pub sequence: u64,
}

impl FileDescriptor {
	pub fn location(&self) -> StoredLocation {
		StoredLocation { folder_id: self.folder_id.clone(), file_id: self.file_id.clone() }
	}

	fn same_file(&self, other: &FileDescriptor) -> bool {
		self.folder_id == other.folder_id && self.file_id == other.file_id
	}
}

/// Content-addressed lookup of previously stored files
pub trait ChecksumIndex {
	/// Candidates for a checksum in recording order; unknown checksums yield
	/// an empty list.
	fn find_by_checksum(&self, checksum: &str) -> Result<Vec<FileDescriptor>, IndexError>;

	/// Drop an entry. Dropping an entry that is already gone is not an error.
	fn invalidate(&self, file: &FileDescriptor) -> Result<(), IndexError>;

	/// Add or refresh an entry
	fn record(&self, file: &FileDescriptor) -> Result<(), IndexError>;
}

/// Table definition for checksum entries
/// Key: "<user>\0<checksum>"
/// Value: json5 encoded Vec<FileDescriptor>
const CHECKSUMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("checksums");

/// Checksum index backed by a redb database, scoped to one user
pub struct RedbChecksumIndex {
	db: redb::Database,
	user: String,
}

impl RedbChecksumIndex {
	/// Open or create the index database
	pub fn open(db_path: &path::Path, user: &str) -> Result<Self, IndexError> {
		let db = redb::Database::create(db_path)?;
		{
			let write_txn = db.begin_write()?;
			let _ = write_txn.open_table(CHECKSUMS_TABLE)?;
			write_txn.commit()?;
		}
		debug!("Opened checksum index {} for user {}", db_path.display(), user);
		Ok(RedbChecksumIndex { db, user: user.to_string() })
	}

	/// Open the index for one sync round
	///
	/// An index that cannot be opened (e.g. locked by another session of the
	/// same user) only disables index lookups for this round.
	pub fn open_for_round(db_path: &path::Path, user: &str) -> Option<Self> {
		match Self::open(db_path, user) {
			Ok(index) => Some(index),
			Err(e) => {
				warn!("Checksum index {} unavailable, index lookups disabled: {}", db_path.display(), e);
				None
			}
		}
	}

	pub fn user(&self) -> &str {
		&self.user
	}

	fn key(&self, checksum: &str) -> String {
		format!("{}\0{}", self.user, checksum)
	}

	fn decode(key: &str, bytes: &[u8]) -> Result<Vec<FileDescriptor>, IndexError> {
		let text = std::str::from_utf8(bytes)
			.map_err(|e| IndexError::Corrupted { key: key.to_string(), message: e.to_string() })?;
		json5::from_str(text)
			.map_err(|e| IndexError::Corrupted { key: key.to_string(), message: e.to_string() })
	}

	fn encode(key: &str, entries: &[FileDescriptor]) -> Result<Vec<u8>, IndexError> {
		json5::to_string(&entries)
			.map(String::into_bytes)
			.map_err(|e| IndexError::Corrupted { key: key.to_string(), message: e.to_string() })
	}

	/// Read-modify-write of one checksum entry inside a single write transaction
	fn update<F>(&self, checksum: &str, change: F) -> Result<(), IndexError>
	where
		F: FnOnce(&mut Vec<FileDescriptor>),
	{
		let key = self.key(checksum);
		let write_txn = self.db.begin_write()?;
		{
			let mut table = write_txn.open_table(CHECKSUMS_TABLE)?;
			let mut entries = match table.get(key.as_str())? {
				Some(entry) => Self::decode(&key, entry.value())?,
				None => Vec::new(),
			};
			change(&mut entries);
			if entries.is_empty() {
				table.remove(key.as_str())?;
			} else {
				let bytes = Self::encode(&key, &entries)?;
				table.insert(key.as_str(), bytes.as_slice())?;
			}
		}
		write_txn.commit()?;
		Ok(())
	}
}

impl ChecksumIndex for RedbChecksumIndex {
	fn find_by_checksum(&self, checksum: &str) -> Result<Vec<FileDescriptor>, IndexError> {
		let key = self.key(checksum);
		let read_txn = self.db.begin_read()?;
		let table = read_txn.open_table(CHECKSUMS_TABLE)?;

		match table.get(key.as_str())? {
			Some(entry) => Self::decode(&key, entry.value()),
			None => Ok(Vec::new()),
		}
	}

	fn invalidate(&self, file: &FileDescriptor) -> Result<(), IndexError> {
		debug!("Invalidating index entry {}/{} ({})", file.folder_id, file.file_id, file.checksum);
		self.update(&file.checksum, |entries| entries.retain(|e| !e.same_file(file)))
	}

	fn record(&self, file: &FileDescriptor) -> Result<(), IndexError> {
		self.update(&file.checksum, |entries| {
			match entries.iter_mut().find(|e| e.same_file(file)) {
				Some(existing) => *existing = file.clone(),
				None => entries.push(file.clone()),
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	fn descriptor(file_id: &str, checksum: &str, sequence: u64) -> FileDescriptor {
		FileDescriptor {
			folder_id: "docs".to_string(),
			file_id: file_id.to_string(),
			name: file_id.to_string(),
			checksum: checksum.to_string(),
			sequence,
		}
	}

	#[test]
	fn test_record_and_find() {
		let tmp = TempDir::new().unwrap();
		let index = RedbChecksumIndex::open(&tmp.path().join("index.db"), "alice").unwrap();

		index.record(&descriptor("a.txt", "k1", 1)).unwrap();
		index.record(&descriptor("b.txt", "k1", 2)).unwrap();

		let found = index.find_by_checksum("k1").unwrap();
		assert_eq!(found.len(), 2);
		assert_eq!(found[0].file_id, "a.txt");
		assert_eq!(found[1].file_id, "b.txt");
		assert!(index.find_by_checksum("k2").unwrap().is_empty());
	}

	#[test]
	fn test_record_refreshes_existing_entry() {
		let tmp = TempDir::new().unwrap();
		let index = RedbChecksumIndex::open(&tmp.path().join("index.db"), "alice").unwrap();

		index.record(&descriptor("a.txt", "k1", 1)).unwrap();
		index.record(&descriptor("a.txt", "k1", 5)).unwrap();

		let found = index.find_by_checksum("k1").unwrap();
		assert_eq!(found, vec![descriptor("a.txt", "k1", 5)]);
	}

	#[test]
	fn test_invalidate_is_idempotent() {
		let tmp = TempDir::new().unwrap();
		let index = RedbChecksumIndex::open(&tmp.path().join("index.db"), "alice").unwrap();
		let entry = descriptor("a.txt", "k1", 1);

		index.record(&entry).unwrap();
		index.invalidate(&entry).unwrap();
		assert!(index.find_by_checksum("k1").unwrap().is_empty());

		// A concurrent session may already have removed it
		index.invalidate(&entry).unwrap();
	}

	#[test]
	fn test_locked_index_is_skipped_for_round() {
		let tmp = TempDir::new().unwrap();
		let db_path = tmp.path().join("index.db");
		let first = RedbChecksumIndex::open_for_round(&db_path, "alice");
		assert!(first.is_some());

		assert!(RedbChecksumIndex::open(&db_path, "alice").is_err());
		assert!(RedbChecksumIndex::open_for_round(&db_path, "alice").is_none());

		drop(first);
		assert!(RedbChecksumIndex::open_for_round(&db_path, "alice").is_some());
	}

	#[test]
	fn test_unopenable_path_is_skipped_for_round() {
		let tmp = TempDir::new().unwrap();
		let db_path = tmp.path().join("missing-dir").join("index.db");
		assert!(RedbChecksumIndex::open_for_round(&db_path, "alice").is_none());
	}

	#[test]
	fn test_index_is_scoped_by_user() {
		let tmp = TempDir::new().unwrap();
		let db_path = tmp.path().join("index.db");
		{
			let alice = RedbChecksumIndex::open(&db_path, "alice").unwrap();
			alice.record(&descriptor("a.txt", "k1", 1)).unwrap();
		}
		let bob = RedbChecksumIndex::open(&db_path, "bob").unwrap();
		assert!(bob.find_by_checksum("k1").unwrap().is_empty());
		assert_eq!(bob.user(), "bob");
	}
}

// vim: ts=4
