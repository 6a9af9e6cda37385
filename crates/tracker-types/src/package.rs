//! Package record types for the tracker system.
//!
//! This module defines the package record itself, the partial update applied
//! by edit operations, the per-field diff that feeds the audit history, and
//! the file-attachment and history-entry records owned by a package.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ProcessingFlags, ProcessingStatus};

/// Delivery status of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
	/// In transit by air freight.
	InTransitAir,
	/// In transit by sea freight.
	InTransitSea,
	/// Inland transit after arrival in the destination country.
	InlandTransit,
	/// Arrived, receipt not yet confirmed.
	ArrivedUnconfirmed,
	/// Fully processed.
	Processed,
}

impl DeliveryStatus {
	/// Returns the canonical string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::InTransitAir => "in_transit_air",
			Self::InTransitSea => "in_transit_sea",
			Self::InlandTransit => "inland_transit",
			Self::ArrivedUnconfirmed => "arrived_unconfirmed",
			Self::Processed => "processed",
		}
	}
}

impl fmt::Display for DeliveryStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One tracked shipment record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
	/// Opaque unique key, assigned on creation.
	pub id: String,
	/// Human-assigned package number, unique across all records.
	pub package_number: String,
	/// Name of the shipper.
	pub shipper_name: String,
	/// Date the package was shipped.
	pub shipping_date: NaiveDate,
	/// Estimated arrival date.
	pub estimated_arrival_date: NaiveDate,
	/// Current delivery status.
	pub delivery_status: DeliveryStatus,
	/// Derived data-processing status. Always recomputed from the flags by
	/// every code path that writes them.
	pub data_processing_status: ProcessingStatus,
	/// None on rows written under the legacy single-enum schema; use
	/// [`Package::processing_flags`] for reads.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub has_reservation: Option<bool>,
	/// See [`Package::has_reservation`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_data_confirmed: Option<bool>,
	/// See [`Package::has_reservation`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipping_data_processed: Option<bool>,
	/// Free-text remarks.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub remarks: Option<String>,
	/// Timestamp when this record was created.
	pub created_at: u64,
	/// Timestamp when this record was last updated.
	pub updated_at: u64,
	/// Identifier of the user that created the record.
	pub created_by: String,
}

impl Package {
	/// Processing flags with the legacy fallback applied.
	///
	/// Rows written before the boolean-flag schema carry only the derived
	/// status; their flags are inferred per the documented fallback and the
	/// row itself is left untouched.
	pub fn processing_flags(&self) -> ProcessingFlags {
		let implied = self.data_processing_status.implied_flags();
		ProcessingFlags {
			has_reservation: self.has_reservation.unwrap_or(implied.has_reservation),
			order_data_confirmed: self
				.order_data_confirmed
				.unwrap_or(implied.order_data_confirmed),
			shipping_data_processed: self
				.shipping_data_processed
				.unwrap_or(implied.shipping_data_processed),
		}
	}
}

/// Input for creating a package record. All fields required except remarks;
/// the processing status is derived, never supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInsert {
	/// Human-assigned package number, unique across all records.
	pub package_number: String,
	/// Name of the shipper.
	pub shipper_name: String,
	/// Date the package was shipped.
	pub shipping_date: NaiveDate,
	/// Estimated arrival date.
	pub estimated_arrival_date: NaiveDate,
	/// Initial delivery status.
	pub delivery_status: DeliveryStatus,
	/// Whether the package contains pre-order merchandise.
	pub has_reservation: bool,
	/// Whether the order data has been confirmed.
	pub order_data_confirmed: bool,
	/// Whether the shipping data has been processed.
	pub shipping_data_processed: bool,
	/// Free-text remarks.
	#[serde(default)]
	pub remarks: Option<String>,
	/// Identifier of the creating user.
	pub created_by: String,
}

/// Partial update applied to a package record. Absent fields are left
/// untouched and never diffed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageUpdate {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub package_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipper_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipping_date: Option<NaiveDate>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_arrival_date: Option<NaiveDate>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub delivery_status: Option<DeliveryStatus>,
	/// A directly-supplied status never survives [`PackageUpdate::normalize`];
	/// the label stored is always derived from the merged flags.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data_processing_status: Option<ProcessingStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub has_reservation: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_data_confirmed: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shipping_data_processed: Option<bool>,
	/// Double option: absent leaves remarks untouched, an explicit null
	/// clears them without an audit entry, a string (including the empty
	/// string) is applied and audited.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		deserialize_with = "double_option"
	)]
	pub remarks: Option<Option<String>>,
}

/// Keeps an explicitly-null field distinguishable from an absent one: a
/// present null deserializes as `Some(None)` instead of collapsing to `None`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	Option::<String>::deserialize(deserializer).map(Some)
}

impl PackageUpdate {
	/// Returns true when no field is present.
	pub fn is_empty(&self) -> bool {
		self.package_number.is_none()
			&& self.shipper_name.is_none()
			&& self.shipping_date.is_none()
			&& self.estimated_arrival_date.is_none()
			&& self.delivery_status.is_none()
			&& self.data_processing_status.is_none()
			&& self.has_reservation.is_none()
			&& self.order_data_confirmed.is_none()
			&& self.shipping_data_processed.is_none()
			&& self.remarks.is_none()
	}

	/// Re-establishes the flag/status coupling before the update is applied.
	///
	/// If the update touches any processing flag (or carries a status
	/// directly), the flags are merged onto the current row, forced false
	/// when the merged reservation flag is false, and the status is
	/// overwritten with the label derived from the result. The merged flags
	/// are written back into the update so they participate in diffing.
	pub fn normalize(&mut self, current: &Package) {
		if self.has_reservation.is_none()
			&& self.order_data_confirmed.is_none()
			&& self.shipping_data_processed.is_none()
			&& self.data_processing_status.is_none()
		{
			return;
		}

		let flags = current.processing_flags();
		let has_reservation = self.has_reservation.unwrap_or(flags.has_reservation);
		let mut order_data_confirmed = self
			.order_data_confirmed
			.unwrap_or(flags.order_data_confirmed);
		let mut shipping_data_processed = self
			.shipping_data_processed
			.unwrap_or(flags.shipping_data_processed);
		if !has_reservation {
			order_data_confirmed = false;
			shipping_data_processed = false;
		}

		self.has_reservation = Some(has_reservation);
		self.order_data_confirmed = Some(order_data_confirmed);
		self.shipping_data_processed = Some(shipping_data_processed);
		self.data_processing_status = Some(ProcessingStatus::derive(
			has_reservation,
			order_data_confirmed,
			shipping_data_processed,
		));
	}

	/// Collects one change per present, non-null field whose stringified
	/// value differs from the given record.
	///
	/// An explicit-null remark is applied by [`PackageUpdate::apply`] but is
	/// not a diff candidate; clearing to the empty string is.
	pub fn changes(&self, current: &Package) -> Vec<FieldChange> {
		let mut changes = Vec::new();

		push_change(
			&mut changes,
			PackageField::PackageNumber,
			Some(current.package_number.clone()),
			self.package_number.clone(),
		);
		push_change(
			&mut changes,
			PackageField::ShipperName,
			Some(current.shipper_name.clone()),
			self.shipper_name.clone(),
		);
		push_change(
			&mut changes,
			PackageField::ShippingDate,
			Some(current.shipping_date.to_string()),
			self.shipping_date.map(|d| d.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::EstimatedArrivalDate,
			Some(current.estimated_arrival_date.to_string()),
			self.estimated_arrival_date.map(|d| d.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::DeliveryStatus,
			Some(current.delivery_status.to_string()),
			self.delivery_status.map(|s| s.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::DataProcessingStatus,
			Some(current.data_processing_status.to_string()),
			self.data_processing_status.map(|s| s.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::HasReservation,
			current.has_reservation.map(|b| b.to_string()),
			self.has_reservation.map(|b| b.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::OrderDataConfirmed,
			current.order_data_confirmed.map(|b| b.to_string()),
			self.order_data_confirmed.map(|b| b.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::ShippingDataProcessed,
			current.shipping_data_processed.map(|b| b.to_string()),
			self.shipping_data_processed.map(|b| b.to_string()),
		);
		push_change(
			&mut changes,
			PackageField::Remarks,
			current.remarks.clone(),
			match &self.remarks {
				Some(Some(value)) => Some(value.clone()),
				_ => None,
			},
		);

		changes
	}

	/// Merges the update onto the record. Explicit-null remarks are applied
	/// here even though they are never audited.
	pub fn apply(&self, record: &mut Package) {
		if let Some(value) = &self.package_number {
			record.package_number = value.clone();
		}
		if let Some(value) = &self.shipper_name {
			record.shipper_name = value.clone();
		}
		if let Some(value) = self.shipping_date {
			record.shipping_date = value;
		}
		if let Some(value) = self.estimated_arrival_date {
			record.estimated_arrival_date = value;
		}
		if let Some(value) = self.delivery_status {
			record.delivery_status = value;
		}
		if let Some(value) = self.data_processing_status {
			record.data_processing_status = value;
		}
		if let Some(value) = self.has_reservation {
			record.has_reservation = Some(value);
		}
		if let Some(value) = self.order_data_confirmed {
			record.order_data_confirmed = Some(value);
		}
		if let Some(value) = self.shipping_data_processed {
			record.shipping_data_processed = Some(value);
		}
		if let Some(value) = &self.remarks {
			record.remarks = value.clone();
		}
	}
}

/// Records a change when the new value is present and differs from the old
/// one after stringification.
fn push_change(
	changes: &mut Vec<FieldChange>,
	field: PackageField,
	old_value: Option<String>,
	new_value: Option<String>,
) {
	if let Some(new_value) = new_value {
		if old_value.as_deref() != Some(new_value.as_str()) {
			changes.push(FieldChange {
				field,
				old_value,
				new_value: Some(new_value),
			});
		}
	}
}

/// Symbolic name of a package attribute, as recorded in history entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageField {
	PackageNumber,
	ShipperName,
	ShippingDate,
	EstimatedArrivalDate,
	DeliveryStatus,
	DataProcessingStatus,
	HasReservation,
	OrderDataConfirmed,
	ShippingDataProcessed,
	Remarks,
}

impl PackageField {
	/// Returns the attribute name as recorded in history entries.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::PackageNumber => "package_number",
			Self::ShipperName => "shipper_name",
			Self::ShippingDate => "shipping_date",
			Self::EstimatedArrivalDate => "estimated_arrival_date",
			Self::DeliveryStatus => "delivery_status",
			Self::DataProcessingStatus => "data_processing_status",
			Self::HasReservation => "has_reservation",
			Self::OrderDataConfirmed => "order_data_confirmed",
			Self::ShippingDataProcessed => "shipping_data_processed",
			Self::Remarks => "remarks",
		}
	}
}

impl fmt::Display for PackageField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One stringified field difference between a record and a proposed update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
	/// The attribute that changed.
	pub field: PackageField,
	/// Value held before the update, if any.
	pub old_value: Option<String>,
	/// Value written by the update.
	pub new_value: Option<String>,
}

/// Binary attachment tied to exactly one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageFile {
	/// Unique identifier for this attachment.
	pub id: String,
	/// Identifier of the owning package.
	pub package_id: String,
	/// Original file name as uploaded.
	pub file_name: String,
	/// Path of the blob in the file store.
	pub file_path: String,
	/// Size in bytes.
	pub file_size: u64,
	/// MIME type, restricted at the upload boundary.
	pub mime_type: String,
	/// Timestamp when the file was uploaded.
	pub created_at: u64,
	/// Identifier of the uploading user.
	pub uploaded_by: String,
}

/// One immutable audit record of a single field change.
///
/// Entries are append-only; they are removed only when the owning package is
/// deleted, and consumed most-recent-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
	/// Unique identifier for this entry.
	pub id: String,
	/// Identifier of the owning package.
	pub package_id: String,
	/// The attribute that changed.
	pub field: PackageField,
	/// Stringified value before the change.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub old_value: Option<String>,
	/// Stringified value after the change.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub new_value: Option<String>,
	/// Timestamp of the change.
	pub changed_at: u64,
	/// Identifier of the acting user.
	pub changed_by: String,
	/// Optional free-text reason, shared by every entry of one update call.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_package() -> Package {
		Package {
			id: "pkg-1".into(),
			package_number: "PKG-001".into(),
			shipper_name: "Acme Logistics".into(),
			shipping_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
			estimated_arrival_date: NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
			delivery_status: DeliveryStatus::InTransitSea,
			data_processing_status: ProcessingStatus::Pending,
			has_reservation: Some(true),
			order_data_confirmed: Some(false),
			shipping_data_processed: Some(false),
			remarks: None,
			created_at: 1_700_000_000,
			updated_at: 1_700_000_000,
			created_by: "user-1".into(),
		}
	}

	#[test]
	fn changes_capture_only_differing_fields() {
		let current = sample_package();
		let update = PackageUpdate {
			shipper_name: Some("Globex Freight".into()),
			delivery_status: Some(DeliveryStatus::InTransitSea),
			..Default::default()
		};

		let changes = update.changes(&current);
		assert_eq!(changes.len(), 1);
		assert_eq!(changes[0].field, PackageField::ShipperName);
		assert_eq!(changes[0].old_value.as_deref(), Some("Acme Logistics"));
		assert_eq!(changes[0].new_value.as_deref(), Some("Globex Freight"));
	}

	#[test]
	fn same_value_update_produces_no_change() {
		let current = sample_package();
		let update = PackageUpdate {
			package_number: Some("PKG-001".into()),
			..Default::default()
		};
		assert!(update.changes(&current).is_empty());
	}

	#[test]
	fn explicit_null_remarks_apply_without_change_entry() {
		let mut current = sample_package();
		current.remarks = Some("fragile".into());

		let update = PackageUpdate {
			remarks: Some(None),
			..Default::default()
		};
		assert!(update.changes(&current).is_empty());

		let mut record = current.clone();
		update.apply(&mut record);
		assert_eq!(record.remarks, None);
	}

	#[test]
	fn empty_string_remarks_are_audited() {
		let mut current = sample_package();
		current.remarks = Some("fragile".into());

		let update = PackageUpdate {
			remarks: Some(Some(String::new())),
			..Default::default()
		};
		let changes = update.changes(&current);
		assert_eq!(changes.len(), 1);
		assert_eq!(changes[0].field, PackageField::Remarks);
		assert_eq!(changes[0].old_value.as_deref(), Some("fragile"));
		assert_eq!(changes[0].new_value.as_deref(), Some(""));
	}

	#[test]
	fn legacy_flag_change_diffs_against_null() {
		let mut current = sample_package();
		current.has_reservation = None;

		let update = PackageUpdate {
			has_reservation: Some(true),
			..Default::default()
		};
		let changes = update.changes(&current);
		assert_eq!(changes.len(), 1);
		assert_eq!(changes[0].field, PackageField::HasReservation);
		assert_eq!(changes[0].old_value, None);
		assert_eq!(changes[0].new_value.as_deref(), Some("true"));
	}

	#[test]
	fn normalize_forces_flags_false_without_reservation() {
		let mut current = sample_package();
		current.order_data_confirmed = Some(true);
		current.shipping_data_processed = Some(true);
		current.data_processing_status = ProcessingStatus::Complete;

		let mut update = PackageUpdate {
			has_reservation: Some(false),
			..Default::default()
		};
		update.normalize(&current);

		assert_eq!(update.order_data_confirmed, Some(false));
		assert_eq!(update.shipping_data_processed, Some(false));
		assert_eq!(
			update.data_processing_status,
			Some(ProcessingStatus::NoReservation)
		);
	}

	#[test]
	fn normalize_overrides_directly_supplied_status() {
		let current = sample_package();
		let mut update = PackageUpdate {
			data_processing_status: Some(ProcessingStatus::Complete),
			..Default::default()
		};
		update.normalize(&current);

		// The flags are untouched, so the derived label wins over the
		// caller-supplied one.
		assert_eq!(
			update.data_processing_status,
			Some(ProcessingStatus::Pending)
		);
	}

	#[test]
	fn normalize_derives_status_from_merged_flags() {
		let current = sample_package();
		let mut update = PackageUpdate {
			order_data_confirmed: Some(true),
			..Default::default()
		};
		update.normalize(&current);

		assert_eq!(update.has_reservation, Some(true));
		assert_eq!(update.shipping_data_processed, Some(false));
		assert_eq!(
			update.data_processing_status,
			Some(ProcessingStatus::OrderConfirmed)
		);
	}

	#[test]
	fn normalize_leaves_flag_free_updates_alone() {
		let current = sample_package();
		let mut update = PackageUpdate {
			shipper_name: Some("Globex Freight".into()),
			..Default::default()
		};
		update.normalize(&current);
		assert!(update.data_processing_status.is_none());
		assert!(update.has_reservation.is_none());
	}

	#[test]
	fn update_round_trips_explicit_null_through_serde() {
		let update: PackageUpdate =
			serde_json::from_str(r#"{"remarks": null}"#).unwrap();
		assert_eq!(update.remarks, Some(None));

		let update: PackageUpdate = serde_json::from_str("{}").unwrap();
		assert_eq!(update.remarks, None);
	}
}
