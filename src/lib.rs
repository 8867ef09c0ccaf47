//! # syncopt - Sync Instruction Optimizer
//!
//! Rewrites the naive action set produced by diffing a client and a server
//! replica into a minimal, rename/move/copy aware and correctly ordered
//! action set that an executor can apply safely.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use syncopt::config::OptimizerConfig;
//! use syncopt::optimizer::Pipeline;
//!
//! let pipeline = Pipeline::new(OptimizerConfig::default());
//! let files = pipeline.optimize_files(&raw_files, &server_files, Some("docs"));
//! let directories = pipeline.optimize_directories(&raw_directories);
//! ```
//!
//! ## Copy Detection With A Checksum Index
//!
//! ```rust,ignore
//! use syncopt::index::RedbChecksumIndex;
//! use syncopt::storage::LocalStorage;
//!
//! let index = RedbChecksumIndex::open(Path::new("index.redb"), "alice")?;
//! let storage = LocalStorage::new(Path::new("/srv/drive"));
//! let pipeline = Pipeline::new(config).with_index(&index).with_storage(&storage);
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod logging;
pub mod optimizer;
pub mod round;
pub mod storage;
pub mod types;

// Re-export commonly used types and functions
pub use config::OptimizerConfig;
pub use error::{ConfigError, IndexError, OptimizationError, StorageError, SyncOptError};
pub use optimizer::{Optimizer, Pipeline};
pub use round::{OptimizedRound, SyncRound};
pub use types::{
	ActionKind, Cause, Change, DirectoryVersion, DriveAction, DriveVersion, FileVersion, SyncResult,
};

// vim: ts=4
