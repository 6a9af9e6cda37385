//! HTTP server for the parcel tracker API.
//!
//! A thin JSON surface mapping 1:1 onto the core operations. Authentication
//! is handled outside this layer, so mutating requests carry the acting
//! user's id in the body.

use axum::{
	extract::{DefaultBodyLimit, Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Json},
	routing::get,
	Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracker_config::ApiConfig;
use tracker_core::Tracker;
use tracker_types::{
	ApiError, FileContentResponse, HistoryEntry, Package, PackageFile, PackageFilter,
	PackageInsert, PackageListResponse, SignedUrlResponse, UpdatePackageRequest,
	UploadFileRequest,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the tracker core for processing requests.
	pub tracker: Arc<Tracker>,
}

/// Starts the HTTP server for the API.
///
/// This function creates and configures the HTTP server with routing,
/// middleware, and error handling for the endpoints.
pub async fn start_server(
	api_config: ApiConfig,
	tracker: Arc<Tracker>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { tracker };

	// Build the router with /api base path
	let app = Router::new()
		.nest(
			"/api",
			Router::new()
				.route(
					"/packages",
					get(handle_list_packages).post(handle_create_package),
				)
				.route(
					"/packages/{id}",
					get(handle_get_package)
						.patch(handle_update_package)
						.delete(handle_delete_package),
				)
				.route("/packages/{id}/history", get(handle_package_history))
				.route(
					"/packages/{id}/files",
					get(handle_list_files).post(handle_upload_file),
				)
				.route(
					"/files/{id}",
					get(handle_download_file).delete(handle_delete_file),
				)
				.route("/files/{id}/url", get(handle_file_url)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tracker API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles GET /api/packages requests.
///
/// Filter criteria arrive as query parameters; an empty query lists every
/// package, newest first.
async fn handle_list_packages(
	State(state): State<AppState>,
	Query(filter): Query<PackageFilter>,
) -> Result<Json<PackageListResponse>, ApiError> {
	match state.tracker.packages().list_packages(&filter).await {
		Ok(packages) => Ok(Json(PackageListResponse { packages })),
		Err(e) => {
			tracing::warn!("Package listing failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles POST /api/packages requests.
async fn handle_create_package(
	State(state): State<AppState>,
	Json(insert): Json<PackageInsert>,
) -> Result<impl IntoResponse, ApiError> {
	match state.tracker.packages().create_package(insert).await {
		Ok(package) => Ok((StatusCode::CREATED, Json(package))),
		Err(e) => {
			tracing::warn!("Package creation failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/packages/{id} requests.
async fn handle_get_package(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Package>, ApiError> {
	match state.tracker.packages().get_package(&id).await {
		Ok(package) => Ok(Json(package)),
		Err(e) => {
			tracing::warn!("Package retrieval failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles PATCH /api/packages/{id} requests.
///
/// Applies the partial update and appends one history entry per changed
/// field, attributed to the actor in the request body.
async fn handle_update_package(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<UpdatePackageRequest>,
) -> Result<Json<Package>, ApiError> {
	match state
		.tracker
		.packages()
		.update_package(
			&id,
			request.update,
			&request.changed_by,
			request.reason.as_deref(),
		)
		.await
	{
		Ok(package) => Ok(Json(package)),
		Err(e) => {
			tracing::warn!("Package update failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles DELETE /api/packages/{id} requests.
///
/// Deletion cascades to the package's files and history.
async fn handle_delete_package(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
	match state.tracker.packages().delete_package(&id).await {
		Ok(()) => Ok(StatusCode::NO_CONTENT),
		Err(e) => {
			tracing::warn!("Package deletion failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/packages/{id}/history requests.
async fn handle_package_history(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
	match state.tracker.packages().package_history(&id).await {
		Ok(entries) => Ok(Json(entries)),
		Err(e) => {
			tracing::warn!("History retrieval failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/packages/{id}/files requests.
async fn handle_list_files(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Vec<PackageFile>>, ApiError> {
	match state.tracker.files().list(&id).await {
		Ok(files) => Ok(Json(files)),
		Err(e) => {
			tracing::warn!("File listing failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles POST /api/packages/{id}/files requests.
///
/// File content travels base64-encoded in the JSON body; the MIME allowlist
/// and size cap are enforced by the core before anything is written.
async fn handle_upload_file(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Json(request): Json<UploadFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
	let content = BASE64
		.decode(request.content.as_bytes())
		.map_err(|e| ApiError::BadRequest {
			message: format!("Invalid base64 content: {}", e),
		})?;

	match state
		.tracker
		.files()
		.upload(
			&id,
			&request.file_name,
			content,
			&request.mime_type,
			&request.uploaded_by,
		)
		.await
	{
		Ok(file) => Ok((StatusCode::CREATED, Json(file))),
		Err(e) => {
			tracing::warn!("File upload failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/files/{id} requests.
async fn handle_download_file(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<FileContentResponse>, ApiError> {
	match state.tracker.files().download(&id).await {
		Ok((file, content)) => Ok(Json(FileContentResponse {
			file,
			content: BASE64.encode(content),
		})),
		Err(e) => {
			tracing::warn!("File download failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles DELETE /api/files/{id} requests.
async fn handle_delete_file(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
	match state.tracker.files().delete(&id).await {
		Ok(()) => Ok(StatusCode::NO_CONTENT),
		Err(e) => {
			tracing::warn!("File deletion failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/files/{id}/url requests.
async fn handle_file_url(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<SignedUrlResponse>, ApiError> {
	match state.tracker.files().signed_url(&id).await {
		Ok(signed) => Ok(Json(SignedUrlResponse {
			url: signed.url,
			expires_at: signed.expires_at,
		})),
		Err(e) => {
			tracing::warn!("Signed URL issuance failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}
