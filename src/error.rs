//! Errors raised by the renaming core and the pipeline stage.

use crate::naming::Category;

/// Errors that can occur while shortening tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
	#[error("Streams not supported!")]
	StreamsNotSupported,

	#[error("Name space exhausted for {category} names")]
	CapacityExceeded { category: Category },

	#[error("Custom prefix must not be empty")]
	EmptyPrefix,

	#[error("Invalid extension list: {0}")]
	InvalidExtensions(String),
}
