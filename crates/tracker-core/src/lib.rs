//! Core engine for the parcel tracker system.
//!
//! This module provides the package service (record CRUD with the
//! audit-on-update mechanism) and the builder that wires the configured
//! storage and blob backends into a running tracker. The store client is
//! always passed in explicitly; nothing here holds ambient global state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracker_config::Config;
use tracker_files::{BlobError, BlobService};
use tracker_storage::{StorageError, StorageService};
use tracker_types::{
	current_timestamp, truncate_id, ApiError, HistoryEntry, Package, PackageFilter, PackageInsert,
	PackageUpdate, ProcessingStatus, StoreTable,
};
use uuid::Uuid;

pub mod files;

pub use files::FileService;

/// Errors that can occur during tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
	/// The referenced record does not exist.
	#[error("Not found")]
	NotFound,
	/// Malformed or conflicting input, e.g. a duplicate package number.
	#[error("Validation failed: {0}")]
	Validation(String),
	/// The external store rejected a read or write.
	#[error("Persistence error: {0}")]
	Persistence(String),
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
}

impl From<StorageError> for TrackerError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => TrackerError::NotFound,
			other => TrackerError::Persistence(other.to_string()),
		}
	}
}

impl From<BlobError> for TrackerError {
	fn from(err: BlobError) -> Self {
		match err {
			BlobError::NotFound => TrackerError::NotFound,
			BlobError::InvalidFileType(_) | BlobError::FileTooLarge { .. } => {
				TrackerError::Validation(err.to_string())
			}
			other => TrackerError::Persistence(other.to_string()),
		}
	}
}

impl From<TrackerError> for ApiError {
	fn from(err: TrackerError) -> Self {
		match err {
			TrackerError::NotFound => ApiError::NotFound {
				message: "Resource not found".to_string(),
			},
			TrackerError::Validation(message) => ApiError::UnprocessableEntity { message },
			TrackerError::Persistence(message) | TrackerError::Config(message) => {
				ApiError::InternalServerError { message }
			}
		}
	}
}

/// Package record service with audit-on-update.
///
/// Every mutation is one read-then-write round trip against the injected
/// storage service. There is no cross-call coordination: two concurrent
/// updates of the same record may both diff against the same prior state,
/// which is the accepted last-write-wins model.
pub struct PackageService {
	/// Storage service for record persistence.
	storage: Arc<StorageService>,
	/// File service, needed for the delete cascade.
	files: Arc<FileService>,
}

impl PackageService {
	/// Creates a new PackageService over the given storage and file services.
	pub fn new(storage: Arc<StorageService>, files: Arc<FileService>) -> Self {
		Self { storage, files }
	}

	/// Creates a package record.
	///
	/// The processing status is always derived from the supplied flags;
	/// without a reservation the other two flags are forced false. A package
	/// number already held by another record is rejected before anything is
	/// written.
	pub async fn create_package(&self, insert: PackageInsert) -> Result<Package, TrackerError> {
		let has_reservation = insert.has_reservation;
		let order_data_confirmed = has_reservation && insert.order_data_confirmed;
		let shipping_data_processed = has_reservation && insert.shipping_data_processed;
		let status = ProcessingStatus::derive(
			has_reservation,
			order_data_confirmed,
			shipping_data_processed,
		);

		if self
			.storage
			.exists(StoreTable::PackageNumbers.as_str(), &insert.package_number)
			.await?
		{
			return Err(TrackerError::Validation(format!(
				"Package number '{}' is already in use",
				insert.package_number
			)));
		}

		let now = current_timestamp();
		let package = Package {
			id: Uuid::new_v4().to_string(),
			package_number: insert.package_number,
			shipper_name: insert.shipper_name,
			shipping_date: insert.shipping_date,
			estimated_arrival_date: insert.estimated_arrival_date,
			delivery_status: insert.delivery_status,
			data_processing_status: status,
			has_reservation: Some(has_reservation),
			order_data_confirmed: Some(order_data_confirmed),
			shipping_data_processed: Some(shipping_data_processed),
			remarks: insert.remarks,
			created_at: now,
			updated_at: now,
			created_by: insert.created_by,
		};

		// Claim the number first; a row without its index entry would be
		// invisible to the uniqueness check.
		self.storage
			.store(
				StoreTable::PackageNumbers.as_str(),
				&package.package_number,
				&package.id,
			)
			.await?;
		if let Err(e) = self
			.storage
			.store(StoreTable::Packages.as_str(), &package.id, &package)
			.await
		{
			if let Err(cleanup) = self
				.storage
				.remove(StoreTable::PackageNumbers.as_str(), &package.package_number)
				.await
			{
				tracing::warn!(
					package_number = %package.package_number,
					error = %cleanup,
					"Failed to release package number after record write failure"
				);
			}
			return Err(e.into());
		}

		tracing::info!(
			package_id = %truncate_id(&package.id),
			package_number = %package.package_number,
			"Created package"
		);
		Ok(package)
	}

	/// Retrieves a package record by id.
	pub async fn get_package(&self, id: &str) -> Result<Package, TrackerError> {
		Ok(self
			.storage
			.retrieve(StoreTable::Packages.as_str(), id)
			.await?)
	}

	/// Lists package records matching the filter, newest first.
	pub async fn list_packages(&self, filter: &PackageFilter) -> Result<Vec<Package>, TrackerError> {
		let mut packages: Vec<Package> = self
			.storage
			.retrieve_all(StoreTable::Packages.as_str())
			.await?;
		packages.retain(|p| filter.matches(p));
		packages.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| a.id.cmp(&b.id))
		});
		Ok(packages)
	}

	/// Applies a partial update and appends one history entry per changed
	/// field.
	///
	/// The record write and the history appends are not one transaction: a
	/// failed record write produces no history, while a failed history
	/// append after a durable record write is logged and swallowed. The
	/// same reason string is attached to every entry produced by this call.
	pub async fn update_package(
		&self,
		id: &str,
		mut update: PackageUpdate,
		actor: &str,
		reason: Option<&str>,
	) -> Result<Package, TrackerError> {
		let current: Package = self
			.storage
			.retrieve(StoreTable::Packages.as_str(), id)
			.await?;

		update.normalize(&current);

		if let Some(new_number) = &update.package_number {
			if *new_number != current.package_number
				&& self
					.storage
					.exists(StoreTable::PackageNumbers.as_str(), new_number)
					.await?
			{
				return Err(TrackerError::Validation(format!(
					"Package number '{}' is already in use",
					new_number
				)));
			}
		}

		let mut updated = current.clone();
		update.apply(&mut updated);
		updated.updated_at = current_timestamp();

		self.storage
			.update(StoreTable::Packages.as_str(), id, &updated)
			.await?;

		// Re-point the uniqueness index after a rename.
		if updated.package_number != current.package_number {
			self.storage
				.store(
					StoreTable::PackageNumbers.as_str(),
					&updated.package_number,
					&updated.id,
				)
				.await?;
			self.storage
				.remove(StoreTable::PackageNumbers.as_str(), &current.package_number)
				.await?;
		}

		let changes = update.changes(&current);
		for change in &changes {
			let entry = HistoryEntry {
				id: Uuid::new_v4().to_string(),
				package_id: id.to_string(),
				field: change.field,
				old_value: change.old_value.clone(),
				new_value: change.new_value.clone(),
				changed_at: updated.updated_at,
				changed_by: actor.to_string(),
				reason: reason.map(str::to_string),
			};
			// Best-effort: the record mutation is already durable, so a lost
			// audit entry is reported rather than failing the operation.
			if let Err(e) = self
				.storage
				.store(StoreTable::StatusHistory.as_str(), &entry.id, &entry)
				.await
			{
				tracing::warn!(
					package_id = %truncate_id(id),
					field = %entry.field,
					error = %e,
					"Failed to append history entry"
				);
			}
		}

		tracing::info!(
			package_id = %truncate_id(id),
			changed_fields = changes.len(),
			"Updated package"
		);
		Ok(updated)
	}

	/// Returns the audit history of a package, newest first.
	pub async fn package_history(
		&self,
		package_id: &str,
	) -> Result<Vec<HistoryEntry>, TrackerError> {
		let mut entries: Vec<HistoryEntry> = self
			.storage
			.retrieve_all(StoreTable::StatusHistory.as_str())
			.await?;
		entries.retain(|e| e.package_id == package_id);
		entries.sort_by(|a, b| {
			b.changed_at
				.cmp(&a.changed_at)
				.then_with(|| b.id.cmp(&a.id))
		});
		Ok(entries)
	}

	/// Deletes a package and everything it owns: file blobs, file records,
	/// history entries, and its number index entry.
	pub async fn delete_package(&self, id: &str) -> Result<(), TrackerError> {
		let package: Package = self
			.storage
			.retrieve(StoreTable::Packages.as_str(), id)
			.await?;

		self.files.delete_for_package(id).await?;

		for entry in self.package_history(id).await? {
			self.storage
				.remove(StoreTable::StatusHistory.as_str(), &entry.id)
				.await?;
		}

		self.storage
			.remove(StoreTable::PackageNumbers.as_str(), &package.package_number)
			.await?;
		self.storage
			.remove(StoreTable::Packages.as_str(), id)
			.await?;

		tracing::info!(
			package_id = %truncate_id(id),
			package_number = %package.package_number,
			"Deleted package"
		);
		Ok(())
	}
}

/// A fully wired tracker: configuration plus the package and file services.
pub struct Tracker {
	/// Tracker configuration.
	config: Config,
	/// Package record service.
	packages: PackageService,
	/// File attachment service.
	files: Arc<FileService>,
}

impl Tracker {
	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the package service.
	pub fn packages(&self) -> &PackageService {
		&self.packages
	}

	/// Returns a reference to the file service.
	pub fn files(&self) -> &FileService {
		&self.files
	}
}

/// Builder for constructing a Tracker with pluggable backends.
///
/// Backends are created through factory functions registered by name; the
/// name in the configuration selects which factory runs, and each backend's
/// own configuration schema validates its section before use.
pub struct TrackerBuilder {
	config: Config,
	storage_factories: HashMap<String, tracker_storage::StorageFactory>,
	blob_factories: HashMap<String, tracker_files::BlobFactory>,
}

impl TrackerBuilder {
	/// Creates a new TrackerBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			storage_factories: HashMap::new(),
			blob_factories: HashMap::new(),
		}
	}

	/// Registers a factory function for a storage backend.
	///
	/// The name parameter should match the implementation name in the
	/// configuration.
	pub fn with_storage_factory(
		mut self,
		name: &str,
		factory: tracker_storage::StorageFactory,
	) -> Self {
		self.storage_factories.insert(name.to_string(), factory);
		self
	}

	/// Registers a factory function for a blob store backend.
	pub fn with_blob_factory(mut self, name: &str, factory: tracker_files::BlobFactory) -> Self {
		self.blob_factories.insert(name.to_string(), factory);
		self
	}

	/// Builds the Tracker using the configured factories.
	pub fn build(self) -> Result<Tracker, TrackerError> {
		let storage_name = &self.config.storage.primary;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_name)
			.ok_or_else(|| {
				TrackerError::Config(format!(
					"No configuration for storage backend '{}'",
					storage_name
				))
			})?;
		let storage_factory = self.storage_factories.get(storage_name).ok_or_else(|| {
			TrackerError::Config(format!("Storage factory '{}' not registered", storage_name))
		})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			TrackerError::Config(format!(
				"Failed to create storage backend '{}': {}",
				storage_name, e
			))
		})?;
		storage_backend
			.config_schema()
			.validate(storage_config)
			.map_err(|e| {
				TrackerError::Config(format!(
					"Invalid configuration for storage backend '{}': {}",
					storage_name, e
				))
			})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_name, "Loaded");

		let blob_name = &self.config.blobs.primary;
		let blob_config = self
			.config
			.blobs
			.implementations
			.get(blob_name)
			.ok_or_else(|| {
				TrackerError::Config(format!(
					"No configuration for blob backend '{}'",
					blob_name
				))
			})?;
		let blob_factory = self.blob_factories.get(blob_name).ok_or_else(|| {
			TrackerError::Config(format!("Blob factory '{}' not registered", blob_name))
		})?;
		let blob_backend = blob_factory(blob_config).map_err(|e| {
			TrackerError::Config(format!(
				"Failed to create blob backend '{}': {}",
				blob_name, e
			))
		})?;
		blob_backend
			.config_schema()
			.validate(blob_config)
			.map_err(|e| {
				TrackerError::Config(format!(
					"Invalid configuration for blob backend '{}': {}",
					blob_name, e
				))
			})?;
		let blobs = Arc::new(BlobService::new(blob_backend));
		tracing::info!(component = "blobs", implementation = %blob_name, "Loaded");

		let files = Arc::new(FileService::new(
			Arc::clone(&storage),
			blobs,
			Duration::from_secs(self.config.blobs.signed_url_ttl_seconds),
		));
		let packages = PackageService::new(storage, Arc::clone(&files));

		Ok(Tracker {
			config: self.config,
			packages,
			files,
		})
	}
}
