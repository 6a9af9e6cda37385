//! API types for the tracker HTTP surface.
//!
//! Request and response bodies plus the typed API error. Authentication is
//! out of scope for this layer, so mutating requests carry the acting user's
//! id explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Package, PackageFile, PackageUpdate};

/// Body of a package update request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePackageRequest {
	/// The partial update to apply.
	pub update: PackageUpdate,
	/// Identifier of the acting user, recorded on every history entry.
	pub changed_by: String,
	/// Optional free-text reason, shared by every history entry produced by
	/// this call.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

/// Body of a file upload request. Content travels base64-encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileRequest {
	/// Original file name.
	pub file_name: String,
	/// Declared MIME type, checked against the upload allowlist.
	pub mime_type: String,
	/// Base64-encoded file content.
	pub content: String,
	/// Identifier of the uploading user.
	pub uploaded_by: String,
}

/// A file record together with its base64-encoded content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContentResponse {
	/// The attachment record.
	pub file: PackageFile,
	/// Base64-encoded file content.
	pub content: String,
}

/// A time-limited URL for direct file access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedUrlResponse {
	/// The signed URL.
	pub url: String,
	/// Unix timestamp after which the URL is no longer valid.
	pub expires_at: u64,
}

/// Listing response for packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageListResponse {
	/// Matching records, newest first.
	pub packages: Vec<Package>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Machine-readable error kind.
	pub error: String,
	/// Human-readable message.
	pub message: String,
}

/// Typed API error with an HTTP status mapping.
#[derive(Debug, Clone)]
pub enum ApiError {
	/// Malformed request (400).
	BadRequest { message: String },
	/// Referenced resource does not exist (404).
	NotFound { message: String },
	/// Business-rule violation, e.g. a duplicate package number (422).
	UnprocessableEntity { message: String },
	/// Internal server error (500).
	InternalServerError { message: String },
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::UnprocessableEntity { .. } => 422,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message) = match self {
			ApiError::BadRequest { message } => ("bad_request", message),
			ApiError::NotFound { message } => ("not_found", message),
			ApiError::UnprocessableEntity { message } => ("unprocessable_entity", message),
			ApiError::InternalServerError { message } => ("internal_server_error", message),
		};
		ErrorResponse {
			error: error.to_string(),
			message: message.clone(),
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message } => write!(f, "Not Found: {}", message),
			ApiError::UnprocessableEntity { message } => {
				write!(f, "Unprocessable Entity: {}", message)
			}
			ApiError::InternalServerError { message } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for ApiError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}
