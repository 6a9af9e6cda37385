//! Storage-related types for the tracker system.

use std::str::FromStr;

/// Storage tables for the different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
	/// Table for package records.
	Packages,
	/// Table for file-attachment records.
	PackageFiles,
	/// Table for audit history entries.
	StatusHistory,
	/// Index mapping package numbers to package ids, backing the
	/// uniqueness check.
	PackageNumbers,
}

impl StoreTable {
	/// Returns the string representation of the table name.
	pub fn as_str(&self) -> &'static str {
		match self {
			StoreTable::Packages => "packages",
			StoreTable::PackageFiles => "package_files",
			StoreTable::StatusHistory => "status_history",
			StoreTable::PackageNumbers => "package_numbers",
		}
	}

	/// Returns an iterator over all StoreTable variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Packages,
			Self::PackageFiles,
			Self::StatusHistory,
			Self::PackageNumbers,
		]
		.into_iter()
	}
}

impl FromStr for StoreTable {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"packages" => Ok(Self::Packages),
			"package_files" => Ok(Self::PackageFiles),
			"status_history" => Ok(Self::StatusHistory),
			"package_numbers" => Ok(Self::PackageNumbers),
			_ => Err(()),
		}
	}
}

impl From<StoreTable> for &'static str {
	fn from(table: StoreTable) -> Self {
		table.as_str()
	}
}
