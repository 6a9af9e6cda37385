//! Derived data-processing status for package records.
//!
//! The status is a pure function of three booleans: whether the package
//! carries a reservation, whether its order data has been confirmed, and
//! whether its shipping data has been processed. No code path stores a
//! status that disagrees with the flags it was derived from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Data-processing status label derived from the processing flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
	/// The package carries no reservation; no processing is required.
	NoReservation,
	/// Reservation present, neither processing step done yet.
	Pending,
	/// Order data confirmed, shipping data still outstanding.
	OrderConfirmed,
	/// Shipping data processed, order data still outstanding.
	ShippingProcessed,
	/// Both processing steps done. The retired single-enum schema wrote
	/// this as "processed"; accepted on read, never written back.
	#[serde(alias = "processed")]
	Complete,
}

impl ProcessingStatus {
	/// Derives the status label from the three processing inputs.
	///
	/// Total over the boolean domain: every combination maps to exactly one
	/// label, and a missing reservation wins over the other two flags.
	/// Callers that clear the reservation must also clear the flags; this
	/// function only computes the label and never mutates caller state.
	pub fn derive(
		has_reservation: bool,
		order_data_confirmed: bool,
		shipping_data_processed: bool,
	) -> Self {
		if !has_reservation {
			return Self::NoReservation;
		}
		match (order_data_confirmed, shipping_data_processed) {
			(true, true) => Self::Complete,
			(true, false) => Self::OrderConfirmed,
			(false, true) => Self::ShippingProcessed,
			(false, false) => Self::Pending,
		}
	}

	/// Flags implied by a bare status, for rows that predate the flag
	/// columns. The inference goes no further than this documented
	/// fallback; it does not attempt to reconstruct edit history.
	pub fn implied_flags(&self) -> ProcessingFlags {
		ProcessingFlags {
			has_reservation: *self != Self::NoReservation,
			order_data_confirmed: matches!(self, Self::OrderConfirmed | Self::Complete),
			shipping_data_processed: matches!(self, Self::ShippingProcessed | Self::Complete),
		}
	}

	/// Returns the canonical string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::NoReservation => "no_reservation",
			Self::Pending => "pending",
			Self::OrderConfirmed => "order_confirmed",
			Self::ShippingProcessed => "shipping_processed",
			Self::Complete => "complete",
		}
	}
}

impl fmt::Display for ProcessingStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The three processing inputs, resolved for a concrete record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingFlags {
	/// Whether the package contains pre-order merchandise requiring
	/// extra processing.
	pub has_reservation: bool,
	/// Whether the order data has been confirmed.
	pub order_data_confirmed: bool,
	/// Whether the shipping data has been processed.
	pub shipping_data_processed: bool,
}

impl ProcessingFlags {
	/// Derives the status label for these flags.
	pub fn derive_status(&self) -> ProcessingStatus {
		ProcessingStatus::derive(
			self.has_reservation,
			self.order_data_confirmed,
			self.shipping_data_processed,
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_reservation_wins_over_other_flags() {
		for order in [false, true] {
			for shipping in [false, true] {
				assert_eq!(
					ProcessingStatus::derive(false, order, shipping),
					ProcessingStatus::NoReservation
				);
			}
		}
	}

	#[test]
	fn reserved_combinations_map_to_distinct_labels() {
		assert_eq!(
			ProcessingStatus::derive(true, true, true),
			ProcessingStatus::Complete
		);
		assert_eq!(
			ProcessingStatus::derive(true, true, false),
			ProcessingStatus::OrderConfirmed
		);
		assert_eq!(
			ProcessingStatus::derive(true, false, true),
			ProcessingStatus::ShippingProcessed
		);
		assert_eq!(
			ProcessingStatus::derive(true, false, false),
			ProcessingStatus::Pending
		);
	}

	#[test]
	fn implied_flags_follow_documented_fallback() {
		let flags = ProcessingStatus::OrderConfirmed.implied_flags();
		assert!(flags.has_reservation);
		assert!(flags.order_data_confirmed);
		assert!(!flags.shipping_data_processed);

		let flags = ProcessingStatus::Complete.implied_flags();
		assert!(flags.has_reservation);
		assert!(flags.order_data_confirmed);
		assert!(flags.shipping_data_processed);

		let flags = ProcessingStatus::NoReservation.implied_flags();
		assert!(!flags.has_reservation);
		assert!(!flags.order_data_confirmed);
		assert!(!flags.shipping_data_processed);
	}

	#[test]
	fn implied_flags_round_trip_through_derive() {
		for status in [
			ProcessingStatus::NoReservation,
			ProcessingStatus::Pending,
			ProcessingStatus::OrderConfirmed,
			ProcessingStatus::ShippingProcessed,
			ProcessingStatus::Complete,
		] {
			assert_eq!(status.implied_flags().derive_status(), status);
		}
	}

	#[test]
	fn legacy_label_deserializes_as_complete() {
		let status: ProcessingStatus = serde_json::from_str("\"processed\"").unwrap();
		assert_eq!(status, ProcessingStatus::Complete);
		// The legacy spelling is never written back out.
		assert_eq!(serde_json::to_string(&status).unwrap(), "\"complete\"");
	}
}
