//! Filter criteria for package listings.
//!
//! All filtered reads go through one criteria struct with named optional
//! fields and one matching function, instead of ad-hoc chained query
//! building at each call site.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::{DeliveryStatus, Package, ProcessingStatus};

/// Criteria for a filtered package read. Every field is optional; an empty
/// filter matches all records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageFilter {
	/// Restrict to one delivery status.
	pub delivery_status: Option<DeliveryStatus>,
	/// Restrict to one data-processing status.
	pub data_processing_status: Option<ProcessingStatus>,
	/// Earliest shipping date, inclusive.
	pub shipping_date_from: Option<NaiveDate>,
	/// Latest shipping date, inclusive.
	pub shipping_date_to: Option<NaiveDate>,
	/// Earliest estimated arrival date, inclusive.
	pub estimated_arrival_date_from: Option<NaiveDate>,
	/// Latest estimated arrival date, inclusive.
	pub estimated_arrival_date_to: Option<NaiveDate>,
	/// Case-insensitive substring match against package number, shipper
	/// name, and remarks.
	pub search: Option<String>,
}

impl PackageFilter {
	/// Returns true when no criterion is set.
	pub fn is_empty(&self) -> bool {
		self.delivery_status.is_none()
			&& self.data_processing_status.is_none()
			&& self.shipping_date_from.is_none()
			&& self.shipping_date_to.is_none()
			&& self.estimated_arrival_date_from.is_none()
			&& self.estimated_arrival_date_to.is_none()
			&& self.search.is_none()
	}

	/// Evaluates every set criterion against the record.
	pub fn matches(&self, package: &Package) -> bool {
		if let Some(status) = self.delivery_status {
			if package.delivery_status != status {
				return false;
			}
		}
		if let Some(status) = self.data_processing_status {
			if package.data_processing_status != status {
				return false;
			}
		}
		if let Some(from) = self.shipping_date_from {
			if package.shipping_date < from {
				return false;
			}
		}
		if let Some(to) = self.shipping_date_to {
			if package.shipping_date > to {
				return false;
			}
		}
		if let Some(from) = self.estimated_arrival_date_from {
			if package.estimated_arrival_date < from {
				return false;
			}
		}
		if let Some(to) = self.estimated_arrival_date_to {
			if package.estimated_arrival_date > to {
				return false;
			}
		}
		if let Some(query) = &self.search {
			let query = query.to_lowercase();
			let matched = package.package_number.to_lowercase().contains(&query)
				|| package.shipper_name.to_lowercase().contains(&query)
				|| package
					.remarks
					.as_deref()
					.is_some_and(|r| r.to_lowercase().contains(&query));
			if !matched {
				return false;
			}
		}
		true
	}
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
			remarks: Some("Handle with care".into()),
			created_at: 1_700_000_000,
			updated_at: 1_700_000_000,
			created_by: "user-1".into(),
		}
	}

	#[test]
	fn empty_filter_matches_everything() {
		assert!(PackageFilter::default().matches(&sample_package()));
	}

	#[test]
	fn status_criteria_narrow_the_result() {
		let package = sample_package();

		let filter = PackageFilter {
			delivery_status: Some(DeliveryStatus::InTransitSea),
			..Default::default()
		};
		assert!(filter.matches(&package));

		let filter = PackageFilter {
			delivery_status: Some(DeliveryStatus::Processed),
			..Default::default()
		};
		assert!(!filter.matches(&package));

		let filter = PackageFilter {
			data_processing_status: Some(ProcessingStatus::Complete),
			..Default::default()
		};
		assert!(!filter.matches(&package));
	}

	#[test]
	fn date_ranges_are_inclusive() {
		let package = sample_package();

		let filter = PackageFilter {
			shipping_date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
			shipping_date_to: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
			..Default::default()
		};
		assert!(filter.matches(&package));

		let filter = PackageFilter {
			estimated_arrival_date_from: Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
			..Default::default()
		};
		assert!(!filter.matches(&package));
	}

	#[test]
	fn search_matches_number_shipper_and_remarks() {
		let package = sample_package();

		for query in ["pkg-001", "acme", "CARE"] {
			let filter = PackageFilter {
				search: Some(query.into()),
				..Default::default()
			};
			assert!(filter.matches(&package), "query {:?} should match", query);
		}

		let filter = PackageFilter {
			search: Some("globex".into()),
			..Default::default()
		};
		assert!(!filter.matches(&package));
	}

	#[test]
	fn criteria_combine_conjunctively() {
		let package = sample_package();
		let filter = PackageFilter {
			delivery_status: Some(DeliveryStatus::InTransitSea),
			search: Some("globex".into()),
			..Default::default()
		};
		assert!(!filter.matches(&package));
	}
}
