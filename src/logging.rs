//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! debug!("Collapsed rename {}", action);
//! warn!("Pass failed, keeping previous result");
//! ```

pub use tracing::{debug, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `default_level` applies when `RUST_LOG` is not set:
///
/// ```bash
/// RUST_LOG=debug syncopt optimize round.json
/// RUST_LOG=syncopt::optimizer::file_copy=trace syncopt optimize round.json
/// ```
pub fn init_tracing(default_level: &str) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.try_init();
}
