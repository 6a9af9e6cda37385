//! In-memory blob store implementation for the tracker service.
//!
//! Blobs live in a HashMap; signed URLs use a `memory://` pseudo-scheme.
//! Useful for testing and development scenarios without a real object store.

use crate::{BlobError, BlobInterface, SignedUrl};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracker_types::{current_timestamp, ConfigSchema, Schema, ValidationError};

/// Name under which this backend is registered.
pub const NAME: &str = "memory";

/// In-memory blob store implementation.
pub struct MemoryBlobStore {
	/// The in-memory store protected by a read-write lock.
	blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
	/// Creates a new MemoryBlobStore instance.
	pub fn new() -> Self {
		Self {
			blobs: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryBlobStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl BlobInterface for MemoryBlobStore {
	async fn put(&self, path: &str, content: Vec<u8>) -> Result<(), BlobError> {
		let mut blobs = self.blobs.write().await;
		if blobs.contains_key(path) {
			return Err(BlobError::AlreadyExists(path.to_string()));
		}
		blobs.insert(path.to_string(), content);
		Ok(())
	}

	async fn get(&self, path: &str) -> Result<Vec<u8>, BlobError> {
		let blobs = self.blobs.read().await;
		blobs.get(path).cloned().ok_or(BlobError::NotFound)
	}

	async fn delete(&self, path: &str) -> Result<(), BlobError> {
		let mut blobs = self.blobs.write().await;
		blobs.remove(path);
		Ok(())
	}

	async fn exists(&self, path: &str) -> Result<bool, BlobError> {
		let blobs = self.blobs.read().await;
		Ok(blobs.contains_key(path))
	}

	async fn signed_url(&self, path: &str, ttl: Duration) -> Result<SignedUrl, BlobError> {
		if !self.exists(path).await? {
			return Err(BlobError::NotFound);
		}
		let expires_at = current_timestamp() + ttl.as_secs();
		Ok(SignedUrl {
			url: format!("memory://{}?expires={}", path, expires_at),
			expires_at,
		})
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryBlobStoreSchema)
	}
}

/// Configuration schema for MemoryBlobStore.
pub struct MemoryBlobStoreSchema;

impl ConfigSchema for MemoryBlobStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory blob storage has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a memory blob store from configuration.
///
/// Configuration parameters:
/// - None required for memory storage
pub fn create_blob_store(_config: &toml::Value) -> Result<Box<dyn BlobInterface>, BlobError> {
	Ok(Box::new(MemoryBlobStore::new()))
}
