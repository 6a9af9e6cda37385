//! File attachment service for the tracker core.
//!
//! Coordinates the blob store and the record store for uploads, downloads,
//! and deletion. Upload validation happens before any write; a record insert
//! that fails after the blob write removes the blob again so the two stores
//! do not drift apart.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracker_files::{validate_upload, BlobService, SignedUrl};
use tracker_storage::StorageService;
use tracker_types::{current_timestamp, truncate_id, PackageFile, StoreTable};
use uuid::Uuid;

use crate::TrackerError;

/// File attachment service.
pub struct FileService {
	/// Storage service for attachment records.
	storage: Arc<StorageService>,
	/// Blob service for file contents.
	blobs: Arc<BlobService>,
	/// Lifetime of issued signed URLs.
	signed_url_ttl: Duration,
}

impl FileService {
	/// Creates a new FileService over the given storage and blob services.
	pub fn new(
		storage: Arc<StorageService>,
		blobs: Arc<BlobService>,
		signed_url_ttl: Duration,
	) -> Self {
		Self {
			storage,
			blobs,
			signed_url_ttl,
		}
	}

	/// Uploads a file and attaches it to a package.
	///
	/// The MIME allowlist and size cap are checked before anything is
	/// written, and the owning package must exist. Upload is independent of
	/// package creation: a failed upload is retried by the caller, it never
	/// rolls back the package row.
	pub async fn upload(
		&self,
		package_id: &str,
		file_name: &str,
		content: Vec<u8>,
		mime_type: &str,
		actor: &str,
	) -> Result<PackageFile, TrackerError> {
		validate_upload(mime_type, content.len() as u64)?;

		if !self
			.storage
			.exists(StoreTable::Packages.as_str(), package_id)
			.await?
		{
			return Err(TrackerError::NotFound);
		}

		let extension = Path::new(file_name)
			.extension()
			.and_then(|e| e.to_str())
			.unwrap_or("bin");
		let file_path = format!("{}/{}.{}", package_id, Uuid::new_v4(), extension);
		let file_size = content.len() as u64;

		self.blobs.put(&file_path, content).await?;

		let record = PackageFile {
			id: Uuid::new_v4().to_string(),
			package_id: package_id.to_string(),
			file_name: file_name.to_string(),
			file_path: file_path.clone(),
			file_size,
			mime_type: mime_type.to_string(),
			created_at: current_timestamp(),
			uploaded_by: actor.to_string(),
		};

		if let Err(e) = self
			.storage
			.store(StoreTable::PackageFiles.as_str(), &record.id, &record)
			.await
		{
			// The blob must not outlive a failed record insert.
			if let Err(cleanup) = self.blobs.delete(&file_path).await {
				tracing::warn!(
					file_path = %file_path,
					error = %cleanup,
					"Failed to remove blob after record insert failure"
				);
			}
			return Err(e.into());
		}

		tracing::info!(
			package_id = %truncate_id(package_id),
			file_name = %record.file_name,
			file_size = record.file_size,
			"Uploaded file"
		);
		Ok(record)
	}

	/// Returns the attachment record for a file id.
	pub async fn get(&self, file_id: &str) -> Result<PackageFile, TrackerError> {
		Ok(self
			.storage
			.retrieve(StoreTable::PackageFiles.as_str(), file_id)
			.await?)
	}

	/// Lists the attachments of a package, newest first.
	pub async fn list(&self, package_id: &str) -> Result<Vec<PackageFile>, TrackerError> {
		let mut files: Vec<PackageFile> = self
			.storage
			.retrieve_all(StoreTable::PackageFiles.as_str())
			.await?;
		files.retain(|f| f.package_id == package_id);
		files.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| b.id.cmp(&a.id))
		});
		Ok(files)
	}

	/// Returns the attachment record together with its content.
	pub async fn download(&self, file_id: &str) -> Result<(PackageFile, Vec<u8>), TrackerError> {
		let record = self.get(file_id).await?;
		let content = self.blobs.get(&record.file_path).await?;
		Ok((record, content))
	}

	/// Deletes one attachment: the blob first, then the record.
	pub async fn delete(&self, file_id: &str) -> Result<(), TrackerError> {
		let record = self.get(file_id).await?;

		self.blobs.delete(&record.file_path).await?;
		self.storage
			.remove(StoreTable::PackageFiles.as_str(), file_id)
			.await?;

		tracing::info!(
			package_id = %truncate_id(&record.package_id),
			file_name = %record.file_name,
			"Deleted file"
		);
		Ok(())
	}

	/// Issues a time-limited URL for direct access to a file.
	pub async fn signed_url(&self, file_id: &str) -> Result<SignedUrl, TrackerError> {
		let record = self.get(file_id).await?;
		Ok(self
			.blobs
			.signed_url(&record.file_path, self.signed_url_ttl)
			.await?)
	}

	/// Removes every attachment of a package, blobs and records both. Used
	/// by the package-delete cascade.
	pub(crate) async fn delete_for_package(&self, package_id: &str) -> Result<(), TrackerError> {
		for record in self.list(package_id).await? {
			self.blobs.delete(&record.file_path).await?;
			self.storage
				.remove(StoreTable::PackageFiles.as_str(), &record.id)
				.await?;
		}
		Ok(())
	}
}
