//! Blob storage module for the parcel tracker system.
//!
//! This module provides the boundary to the binary file store: put, get,
//! delete, and time-limited signed-URL issuance, keyed by a path string.
//! It also owns the upload input guard (MIME allowlist and size cap), which
//! is enforced before any write reaches a backend.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracker_types::ConfigSchema;

/// Re-export implementations
pub mod implementations {
	pub mod fs;
	pub mod memory;
}

/// Maximum accepted upload size in bytes (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted at the upload boundary.
pub const ALLOWED_MIME_TYPES: &[&str] =
	&["image/jpeg", "image/jpg", "image/png", "application/pdf"];

/// Errors that can occur during blob operations.
#[derive(Debug, Error)]
pub enum BlobError {
	/// Error that occurs when a requested blob is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs when an upload declares a MIME type outside the
	/// allowlist.
	#[error("Invalid file type: {0}")]
	InvalidFileType(String),
	/// Error that occurs when an upload exceeds the size cap.
	#[error("File too large: {size} bytes (max: {max})")]
	FileTooLarge { size: u64, max: u64 },
	/// Error that occurs when a blob already exists at the target path.
	#[error("Blob already exists at: {0}")]
	AlreadyExists(String),
	/// Error that occurs in the blob backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Validates an upload against the MIME allowlist and the size cap.
///
/// This is a pure input guard, checked before any write; nothing in the
/// backends re-validates stored blobs.
pub fn validate_upload(mime_type: &str, size: u64) -> Result<(), BlobError> {
	if !ALLOWED_MIME_TYPES.contains(&mime_type) {
		return Err(BlobError::InvalidFileType(mime_type.to_string()));
	}
	if size > MAX_FILE_SIZE {
		return Err(BlobError::FileTooLarge {
			size,
			max: MAX_FILE_SIZE,
		});
	}
	Ok(())
}

/// A time-limited URL for direct blob access.
#[derive(Debug, Clone)]
pub struct SignedUrl {
	/// The URL itself.
	pub url: String,
	/// Unix timestamp after which the URL is no longer valid.
	pub expires_at: u64,
}

/// Trait defining the low-level interface for blob store backends.
#[async_trait]
pub trait BlobInterface: Send + Sync {
	/// Stores a blob at the given path. Fails if the path is already
	/// occupied; attachment paths are never reused.
	async fn put(&self, path: &str, content: Vec<u8>) -> Result<(), BlobError>;

	/// Retrieves the blob stored at the given path.
	async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError>;

	/// Deletes the blob at the given path.
	async fn delete(&self, path: &str) -> Result<(), BlobError>;

	/// Checks if a blob exists at the given path.
	async fn exists(&self, path: &str) -> Result<bool, BlobError>;

	/// Issues a time-limited URL for the blob at the given path.
	async fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, BlobError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for blob store factory functions.
pub type BlobFactory = fn(&toml::Value) -> Result<Box<dyn BlobInterface>, BlobError>;

/// Get all registered blob store implementations.
pub fn get_all_implementations() -> Vec<(&'static str, BlobFactory)> {
	use implementations::{fs, memory};

	vec![
		(fs::NAME, fs::create_blob_store as BlobFactory),
		(memory::NAME, memory::create_blob_store as BlobFactory),
	]
}

/// High-level blob service wrapping a backend implementation.
pub struct BlobService {
	/// The underlying blob store backend.
	backend: Box<dyn BlobInterface>,
}

impl BlobService {
	/// Creates a new BlobService with the specified backend.
	pub fn new(backend: Box<dyn BlobInterface>) -> Self {
		Self { backend }
	}

	/// Stores a blob at the given path.
	pub async fn put(&self, path: &str, content: Vec<u8>) -> Result<(), BlobError> {
		self.backend.put(path, content).await
	}

	/// Retrieves the blob stored at the given path.
	pub async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
		self.backend.get(path).await
	}

	/// Deletes the blob at the given path.
	pub async fn delete(&self, path: &str) -> Result<(), BlobError> {
		self.backend.delete(path).await
	}

	/// Checks if a blob exists at the given path.
	pub async fn exists(&self, path: &str) -> Result<bool, BlobError> {
		self.backend.exists(path).await
	}

	/// Issues a time-limited URL for the blob at the given path.
	pub async fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, BlobError> {
		self.backend.signed_url(path, ttl).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guard_accepts_allowed_types_at_the_cap() {
		for mime in ALLOWED_MIME_TYPES {
			assert!(validate_upload(mime, MAX_FILE_SIZE).is_ok());
		}
	}

	#[test]
	fn guard_rejects_disallowed_mime_types() {
		let result = validate_upload("image/gif", 1024);
		assert!(matches!(result, Err(BlobError::InvalidFileType(_))));

		let result = validate_upload("application/zip", 1024);
		assert!(matches!(result, Err(BlobError::InvalidFileType(_))));
	}

	#[test]
	fn guard_rejects_oversized_uploads() {
		let result = validate_upload("image/png", MAX_FILE_SIZE + 1);
		assert!(matches!(result, Err(BlobError::FileTooLarge { .. })));
	}
}
