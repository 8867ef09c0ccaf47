//! Error types for syncopt operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for loading rounds and running the optimizer
#[derive(Debug)]
pub enum SyncOptError {
	/// I/O error
	Io(io::Error),

	/// Round document could not be parsed or written
	InvalidRound { message: String },

	/// Invalid configuration (nested)
	Config(ConfigError),

	/// Checksum index error (nested)
	Index(IndexError),

	/// Storage backend error (nested)
	Storage(StorageError),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncOptError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncOptError::Io(e) => write!(f, "I/O error: {}", e),
			SyncOptError::InvalidRound { message } => write!(f, "Invalid sync round: {}", message),
			SyncOptError::Config(e) => write!(f, "Configuration error: {}", e),
			SyncOptError::Index(e) => write!(f, "Checksum index error: {}", e),
			SyncOptError::Storage(e) => write!(f, "Storage error: {}", e),
			SyncOptError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncOptError {}

impl From<io::Error> for SyncOptError {
	fn from(e: io::Error) -> Self {
		SyncOptError::Io(e)
	}
}

impl From<serde_json::Error> for SyncOptError {
	fn from(e: serde_json::Error) -> Self {
		SyncOptError::InvalidRound { message: e.to_string() }
	}
}

impl From<String> for SyncOptError {
	fn from(e: String) -> Self {
		SyncOptError::Other { message: e }
	}
}

impl From<ConfigError> for SyncOptError {
	fn from(e: ConfigError) -> Self {
		SyncOptError::Config(e)
	}
}

impl From<IndexError> for SyncOptError {
	fn from(e: IndexError) -> Self {
		SyncOptError::Index(e)
	}
}

impl From<StorageError> for SyncOptError {
	fn from(e: StorageError) -> Self {
		SyncOptError::Storage(e)
	}
}

/// Failure inside a single optimizer pass
///
/// The pipeline never propagates these; it logs them and keeps the
/// result from before the failing pass.
#[derive(Debug)]
pub enum OptimizationError {
	/// Actions do not have the shape the pass relies on
	StructuralMismatch { pass: &'static str, message: String },
}

impl fmt::Display for OptimizationError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OptimizationError::StructuralMismatch { pass, message } => {
				write!(f, "{}: structural mismatch: {}", pass, message)
			}
		}
	}
}

impl Error for OptimizationError {}

/// Checksum index errors
#[derive(Debug)]
pub enum IndexError {
	/// Database could not be opened or created
	OpenFailed { source: Box<dyn Error + Send + Sync> },

	/// Read or write transaction failed
	TransactionFailed { source: Box<dyn Error + Send + Sync> },

	/// Stored entry could not be decoded
	Corrupted { key: String, message: String },
}

impl fmt::Display for IndexError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			IndexError::OpenFailed { source } => write!(f, "Failed to open index: {}", source),
			IndexError::TransactionFailed { source } => {
				write!(f, "Index transaction failed: {}", source)
			}
			IndexError::Corrupted { key, message } => {
				write!(f, "Index entry {:?} corrupted: {}", key, message)
			}
		}
	}
}

impl Error for IndexError {}

impl From<redb::DatabaseError> for IndexError {
	fn from(e: redb::DatabaseError) -> Self {
		IndexError::OpenFailed { source: Box::new(e) }
	}
}

impl From<redb::TransactionError> for IndexError {
	fn from(e: redb::TransactionError) -> Self {
		IndexError::TransactionFailed { source: Box::new(e) }
	}
}

impl From<redb::TableError> for IndexError {
	fn from(e: redb::TableError) -> Self {
		IndexError::TransactionFailed { source: Box::new(e) }
	}
}

impl From<redb::StorageError> for IndexError {
	fn from(e: redb::StorageError) -> Self {
		IndexError::TransactionFailed { source: Box::new(e) }
	}
}

impl From<redb::CommitError> for IndexError {
	fn from(e: redb::CommitError) -> Self {
		IndexError::TransactionFailed { source: Box::new(e) }
	}
}

/// Storage backend errors
#[derive(Debug)]
pub enum StorageError {
	/// The file no longer exists at the recorded location
	NotFound { folder_id: String, file_id: String },

	/// The backend could not be reached or read
	Unavailable { message: String },
}

impl fmt::Display for StorageError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StorageError::NotFound { folder_id, file_id } => {
				write!(f, "File {} not found in folder {}", file_id, folder_id)
			}
			StorageError::Unavailable { message } => write!(f, "Storage unavailable: {}", message),
		}
	}
}

impl Error for StorageError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file could not be read
	ReadFailed { path: String, source: io::Error },

	/// Config file could not be parsed
	ParseFailed { path: String, message: String },

	/// Environment override has an invalid value
	InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ReadFailed { path, source } => {
				write!(f, "Failed to read config {}: {}", path, source)
			}
			ConfigError::ParseFailed { path, message } => {
				write!(f, "Failed to parse config {}: {}", path, message)
			}
			ConfigError::InvalidValue { key, value } => {
				write!(f, "Invalid value {:?} for {}", value, key)
			}
		}
	}
}

impl Error for ConfigError {}


// vim: ts=4
