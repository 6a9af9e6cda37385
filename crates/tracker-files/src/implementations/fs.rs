//! Filesystem blob store implementation for the tracker service.
//!
//! Blobs are stored as plain files under a root directory, mirroring the
//! `package_id/file_name` path layout. Signed URLs are `file://` pseudo-URLs
//! carrying the expiry; a real deployment would substitute an object store
//! that issues genuinely capability-bearing URLs.

use crate::{BlobError, BlobInterface, SignedUrl};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracker_types::{current_timestamp, ConfigSchema, Field, FieldType, Schema, ValidationError};

/// Name under which this backend is registered.
pub const NAME: &str = "fs";

/// Filesystem blob store implementation.
pub struct FsBlobStore {
	/// Root directory for blob files.
	root_path: PathBuf,
}

impl FsBlobStore {
	/// Creates a new FsBlobStore instance with the specified root.
	pub fn new(root_path: PathBuf) -> Self {
		Self { root_path }
	}

	/// Resolves a blob path below the root, rejecting anything that would
	/// escape it.
	fn resolve(&self, path: &str) -> Result<PathBuf, BlobError> {
		let relative = Path::new(path);
		let escapes = relative
			.components()
			.any(|c| !matches!(c, Component::Normal(_)));
		if escapes || path.is_empty() {
			return Err(BlobError::Backend(format!("Invalid blob path: {}", path)));
		}
		Ok(self.root_path.join(relative))
	}
}

#[async_trait]
impl BlobInterface for FsBlobStore {
	async fn put(&self, path: &str, content: Vec<u8>) -> Result<(), BlobError> {
		let target = self.resolve(path)?;
		if target.exists() {
			return Err(BlobError::AlreadyExists(path.to_string()));
		}

		if let Some(parent) = target.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| BlobError::Backend(e.to_string()))?;
		}

		// Write atomically by writing to temp file then renaming
		let temp_path = target.with_extension("tmp");
		fs::write(&temp_path, content)
			.await
			.map_err(|e| BlobError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &target)
			.await
			.map_err(|e| BlobError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
		let target = self.resolve(path)?;
		match fs::read(&target).await {
			Ok(content) => Ok(content),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
			Err(e) => Err(BlobError::Backend(e.to_string())),
		}
	}

	async fn delete(&self, path: &str) -> Result<(), BlobError> {
		let target = self.resolve(path)?;
		match fs::remove_file(&target).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(BlobError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, path: &str) -> Result<bool, BlobError> {
		let target = self.resolve(path)?;
		Ok(target.exists())
	}

	async fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, BlobError> {
		let target = self.resolve(path)?;
		if !target.exists() {
			return Err(BlobError::NotFound);
		}
		let expires_at = current_timestamp() + ttl.as_secs();
		Ok(SignedUrl {
			url: format!("file://{}?expires={}", target.display(), expires_at),
			expires_at,
		})
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FsBlobStoreSchema)
	}
}

/// Configuration schema for FsBlobStore.
pub struct FsBlobStoreSchema;

impl ConfigSchema for FsBlobStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("root_path", FieldType::String)]);
		schema.validate(config)
	}
}

/// Factory function to create a filesystem blob store from configuration.
///
/// Configuration parameters:
/// - `root_path`: Root directory for blob files (default: "./data/files")
pub fn create_blob_store(config: &toml::Value) -> Result<Box<dyn BlobInterface>, BlobError> {
	let root_path = config
		.get("root_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/files")
		.to_string();

	Ok(Box::new(FsBlobStore::new(PathBuf::from(root_path))))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let store = FsBlobStore::new(dir.path().to_path_buf());
		let path = "pkg-1/1700000000.png";

		store.put(path, b"content".to_vec()).await.unwrap();
		assert_eq!(store.get(path).await.unwrap(), b"content".to_vec());

		store.delete(path).await.unwrap();
		assert!(!store.exists(path).await.unwrap());
	}

	#[tokio::test]
	async fn test_put_rejects_occupied_path() {
		let dir = tempfile::tempdir().unwrap();
		let store = FsBlobStore::new(dir.path().to_path_buf());
		let path = "pkg-1/1700000000.pdf";

		store.put(path, b"first".to_vec()).await.unwrap();
		let result = store.put(path, b"second".to_vec()).await;
		assert!(matches!(result, Err(BlobError::AlreadyExists(_))));
	}

	#[tokio::test]
	async fn test_rejects_escaping_paths() {
		let dir = tempfile::tempdir().unwrap();
		let store = FsBlobStore::new(dir.path().to_path_buf());

		for path in ["../outside.txt", "/etc/passwd", "a/../../b", ""] {
			let result = store.put(path, b"x".to_vec()).await;
			assert!(
				matches!(result, Err(BlobError::Backend(_))),
				"path {:?} should be rejected",
				path
			);
		}
	}
}
